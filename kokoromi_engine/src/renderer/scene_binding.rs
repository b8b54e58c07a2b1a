/// Scene binding - uploads textures and geometry and creates material descriptor sets.

use crate::error::Result;
use crate::scene::Scene;
use crate::engine_debug;
use super::backend::SceneUploader;

/// What a binding pass created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneBindingStats {
    pub textures: usize,
    pub materials: usize,
    pub models: usize,
}

/// Upload every scene resource that is not on the GPU yet
///
/// Order matters: textures first, then the material sets that sample them,
/// then model geometry. CPU pixels are released once a texture is uploaded.
/// Materials without an uploaded diffuse texture get no descriptor set; their
/// meshes are skipped at draw time.
pub fn bind_scene<U: SceneUploader + ?Sized>(uploader: &mut U, scene: &mut Scene) -> Result<SceneBindingStats> {
    let mut stats = SceneBindingStats::default();

    for texture in scene.textures.iter_mut() {
        if texture.gpu.is_some() {
            continue;
        }
        let Some(pixels) = texture.pixels.as_deref() else { continue };

        let handle = uploader.upload_texture(texture.width, texture.height, texture.mip_levels, pixels)?;
        texture.gpu = Some(handle);
        texture.release_pixels();
        stats.textures += 1;

        engine_debug!(
            "kokoromi::renderer",
            "Uploaded texture '{}' ({}x{}, {} mips)",
            texture.name, texture.width, texture.height, texture.mip_levels
        );
    }

    for material in scene.materials.iter_mut() {
        if material.descriptor_set.is_some() {
            continue;
        }
        let texture = material
            .diffuse_texture
            .and_then(|index| scene.textures.get(index))
            .and_then(|texture| texture.gpu);
        let Some(texture) = texture else { continue };

        material.descriptor_set = Some(uploader.create_material_set(texture)?);
        stats.materials += 1;
    }

    for model in scene.models.iter_mut() {
        if model.gpu.is_some() || model.indices.is_empty() {
            continue;
        }

        model.gpu = Some(uploader.upload_geometry(&model.vertices, &model.indices)?);
        stats.models += 1;
    }

    Ok(stats)
}

#[cfg(test)]
#[path = "scene_binding_tests.rs"]
mod tests;
