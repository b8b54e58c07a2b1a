use glam::{Mat4, Vec3};
use crate::scene::primitives;
use crate::scene::{Camera, Material, Mesh, Model, Scene, Vertex};

// ============================================================================
// VERTEX LAYOUT
// ============================================================================

#[test]
fn test_vertex_stride_is_44_bytes() {
    assert_eq!(std::mem::size_of::<Vertex>(), 44);
    assert_eq!(std::mem::offset_of!(Vertex, position), 0);
    assert_eq!(std::mem::offset_of!(Vertex, color), 12);
    assert_eq!(std::mem::offset_of!(Vertex, uv), 24);
    assert_eq!(std::mem::offset_of!(Vertex, normal), 32);
}

#[test]
fn test_vertex_bytes_are_tightly_packed() {
    let vertices = [Vertex::default(); 3];
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);
    assert_eq!(bytes.len(), 132);
}

// ============================================================================
// MESH / SCENE HELPERS
// ============================================================================

#[test]
fn test_mesh_index_count() {
    let mesh = Mesh { index_offset: 6, triangle_count: 4, material_index: 0 };
    assert_eq!(mesh.index_count(), 12);
}

#[test]
fn test_add_returns_indices() {
    let mut scene = Scene::new();
    let tex = scene.add_texture(primitives::checkerboard("c", 4, 2, [0; 4], [255; 4]).unwrap());
    let a = scene.add_material(Material::new("a", Some(tex)));
    let b = scene.add_material(Material::new("b", None));

    assert_eq!(tex, 0);
    assert_eq!((a, b), (0, 1));
    assert_eq!(scene.materials[a].diffuse_texture, Some(0));
    assert!(scene.materials[b].descriptor_set.is_none());
}

#[test]
fn test_material_for_out_of_range_is_none() {
    let mut scene = Scene::new();
    scene.add_material(Material::new("only", None));
    let mesh = Mesh { index_offset: 0, triangle_count: 1, material_index: 3 };
    assert!(scene.material_for(&mesh).is_none());
}

#[test]
fn test_active_camera_is_first() {
    let mut scene = Scene::new();
    assert!(scene.active_camera().is_none());
    for (i, fov) in [60.0, 30.0].into_iter().enumerate() {
        scene.cameras.push(Camera {
            name: format!("cam{}", i),
            world_transform: Mat4::IDENTITY,
            field_of_view: fov,
        });
    }
    assert_eq!(scene.active_camera().unwrap().name, "cam0");
}

#[test]
fn test_triangle_count_sums_meshes() {
    let mut scene = Scene::new();
    let quad = primitives::quad(1.0, Vec3::ONE, 0);
    scene.add_model(Model {
        name: "quad".to_string(),
        world_transform: Mat4::IDENTITY,
        vertices: quad.vertices,
        indices: quad.indices,
        meshes: vec![
            Mesh { index_offset: 0, triangle_count: 1, material_index: 0 },
            Mesh { index_offset: 3, triangle_count: 1, material_index: 0 },
        ],
        gpu: None,
    });
    assert_eq!(scene.triangle_count(), 2);
}

// ============================================================================
// PRIMITIVES
// ============================================================================

#[test]
fn test_quad_has_four_vertices_six_indices() {
    let quad = primitives::quad(0.5, Vec3::ONE, 2);
    assert_eq!(quad.vertices.len(), 4);
    assert_eq!(quad.indices, vec![0, 1, 2, 2, 3, 0]);
    assert_eq!(quad.meshes.len(), 1);
    assert_eq!(quad.meshes[0].material_index, 2);
    assert_eq!(quad.meshes[0].index_count(), 6);
}

#[test]
fn test_quad_winding_faces_positive_z() {
    let quad = primitives::quad(1.0, Vec3::ONE, 0);
    let p = |i: u32| quad.vertices[i as usize].position;
    let normal = (p(1) - p(0)).cross(p(2) - p(0));
    assert!(normal.z > 0.0);
}

#[test]
fn test_checkerboard_alternates() {
    let texture = primitives::checkerboard("c", 4, 2, [0, 0, 0, 255], [255, 255, 255, 255]).unwrap();
    let pixels = texture.pixels.as_ref().unwrap();
    assert_eq!(pixels.len(), 64);
    // texel (0,0) is `a`, texel (2,0) is `b`
    assert_eq!(&pixels[0..4], &[0, 0, 0, 255]);
    assert_eq!(&pixels[8..12], &[255, 255, 255, 255]);
    assert_eq!(texture.mip_levels, 3);
}
