/// Scene draw recording - one indexed draw per mesh of every uploaded model.

use crate::error::Result;
use crate::scene::Scene;
use super::command_list::{CommandList, IndexType, ShaderStageFlags};
use super::uniforms::PushConstants;

/// Counters of one recorded frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub draw_calls: u32,
    pub triangles: u64,
    /// Meshes whose material has no descriptor set
    pub skipped_meshes: u32,
}

/// Record the scene's draws into `cmd`
///
/// Must be called inside the mesh render pass with the pipeline bound. Models
/// without GPU geometry are ignored. `dynamic_offset` selects the frame slot's
/// block of the uniform buffer.
pub fn record_scene<C: CommandList + ?Sized>(
    cmd: &mut C,
    scene: &Scene,
    dynamic_offset: u32,
) -> Result<DrawStats> {
    let mut stats = DrawStats::default();

    for model in &scene.models {
        let Some(geometry) = model.gpu else { continue };

        cmd.bind_vertex_buffer(geometry.vertex_buffer, 0)?;
        cmd.bind_index_buffer(geometry.index_buffer, 0, IndexType::U32)?;

        let push = PushConstants { model: model.world_transform };
        cmd.push_constants(ShaderStageFlags::ALL_GRAPHICS, 0, bytemuck::bytes_of(&push))?;

        for mesh in &model.meshes {
            let set = scene.material_for(mesh).and_then(|material| material.descriptor_set);
            let Some(set) = set else {
                stats.skipped_meshes += 1;
                continue;
            };

            cmd.bind_descriptor_set(0, set, &[dynamic_offset])?;
            cmd.draw_indexed(mesh.index_count(), mesh.index_offset, 0)?;

            stats.draw_calls += 1;
            stats.triangles += mesh.triangle_count as u64;
        }
    }

    Ok(stats)
}

#[cfg(test)]
#[path = "scene_recorder_tests.rs"]
mod tests;
