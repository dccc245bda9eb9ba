//! Text rendering of an asset's hierarchy and resource slots.

use redlilium_gltfio::{Asset, AssetError, Entity, ResourceState, SlotKind};

/// One line per entity, children indented under their parent.
pub fn hierarchy(asset: &Asset) -> Result<String, AssetError> {
    let mut lines = Vec::new();
    let root = asset.root()?;
    lines.push("<root>".to_string());
    for child in asset.children(root)? {
        entity_lines(asset, child, 1, &mut lines)?;
    }
    Ok(lines.join("\n"))
}

fn entity_lines(
    asset: &Asset,
    entity: Entity,
    depth: usize,
    lines: &mut Vec<String>,
) -> Result<(), AssetError> {
    let mut line = format!(
        "{:indent$}{}",
        "",
        asset.name(entity)?.unwrap_or_else(|| entity.to_string()),
        indent = depth * 2
    );
    if let Some(transform) = asset.transform(entity)? {
        let world = transform.world;
        let translation = [world[(0, 3)], world[(1, 3)], world[(2, 3)]];
        if translation != [0.0; 3] {
            line.push_str(&format!(
                " @ ({:.2}, {:.2}, {:.2})",
                translation[0], translation[1], translation[2]
            ));
        }
    }
    if let Some(renderable) = asset.renderable(entity)? {
        line.push_str(&format!(" [{} primitives]", renderable.primitives.len()));
    }
    lines.push(line);

    for child in asset.children(entity)? {
        entity_lines(asset, child, depth + 1, lines)?;
    }
    Ok(())
}

/// One line per resource slot with its current state.
pub fn slots(asset: &Asset) -> Result<String, AssetError> {
    let lines: Vec<String> = asset
        .resource_states()?
        .into_iter()
        .map(|slot| {
            let kind = match slot.kind {
                SlotKind::Buffer(_) => "buffer",
                SlotKind::Image(_) => "image",
                SlotKind::Primitive { .. } => "primitive",
            };
            let state = match &slot.state {
                ResourceState::Unresolved => "unresolved".to_string(),
                ResourceState::Resolving => "resolving".to_string(),
                ResourceState::Resolved => "resolved".to_string(),
                ResourceState::Failed(failure) => format!("FAILED ({failure})"),
            };
            format!("{:>4}  {kind:<9}  {:<32}  {state}", slot.id.0, slot.label)
        })
        .collect();
    Ok(lines.join("\n"))
}
