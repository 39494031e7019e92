use std::path::Path;

use anyhow::Context;

use crate::{
    data_structures::scene_graph::{
        Face, ImportedScene, RawMaterial, RawMesh, SceneNode, TextureCategory,
    },
    resources::ImportFlags,
};

/**
 * Wavefront obj import via `tobj`.
 *
 * The root node owns no meshes; every object/group of the file becomes one
 * child node with exactly one mesh, in file order. Bump maps are reported as
 * [`TextureCategory::Height`], which is where the default role map expects
 * the normal maps of obj assets.
 */
pub fn import(path: &Path, flags: &ImportFlags) -> anyhow::Result<ImportedScene> {
    let (models, obj_materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: flags.triangulate,
            single_index: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("Failed to load obj file: {:?}", path))?;

    let mut materials: Vec<RawMaterial> = match obj_materials {
        Ok(materials) => materials.iter().map(convert_material).collect(),
        Err(e) => {
            log::warn!(
                "Materials of {:?} could not be loaded ({}); meshes stay untextured.",
                path,
                e
            );
            Vec::new()
        }
    };
    // meshes without a material refer to this one
    let default_material = materials.len();
    materials.push(RawMaterial::new("DefaultMaterial"));

    let mut root = SceneNode::new(
        path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let mut meshes = Vec::with_capacity(models.len());
    for model in models.iter() {
        let mut mesh = convert_mesh(model);
        mesh.material_index = model.mesh.material_id.unwrap_or(default_material);
        root.children.push(SceneNode::new(model.name.clone()).with_meshes([meshes.len()]));
        meshes.push(mesh);
    }

    let incomplete = meshes.is_empty();
    Ok(ImportedScene {
        root: Some(root),
        meshes,
        materials,
        incomplete,
        ..Default::default()
    })
}

fn convert_mesh(model: &tobj::Model) -> RawMesh {
    let m = &model.mesh;
    let vertex_count = m.positions.len() / 3;

    let positions = m.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect();
    let normals = (m.normals.len() == vertex_count * 3 && vertex_count > 0)
        .then(|| m.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect());
    let tex_coords = (m.texcoords.len() == vertex_count * 2 && vertex_count > 0)
        .then(|| m.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect());

    let faces = if m.face_arities.is_empty() {
        m.indices.chunks(3).map(|c| Face::from(c.to_vec())).collect()
    } else {
        let mut faces = Vec::with_capacity(m.face_arities.len());
        let mut start = 0;
        for &arity in &m.face_arities {
            let end = (start + arity as usize).min(m.indices.len());
            faces.push(Face::from(m.indices[start..end].to_vec()));
            start = end;
        }
        faces
    };

    RawMesh {
        name: model.name.clone(),
        positions,
        normals,
        tex_coords,
        tangents: None,
        bitangents: None,
        faces,
        material_index: 0,
    }
}

fn convert_material(m: &tobj::Material) -> RawMaterial {
    let slots = [
        (TextureCategory::Diffuse, &m.diffuse_texture),
        (TextureCategory::Specular, &m.specular_texture),
        (TextureCategory::Ambient, &m.ambient_texture),
        (TextureCategory::Height, &m.normal_texture),
        (TextureCategory::Shininess, &m.shininess_texture),
        (TextureCategory::Opacity, &m.dissolve_texture),
    ];
    slots
        .into_iter()
        .filter_map(|(category, texture)| texture.as_ref().map(|path| (category, path)))
        .fold(RawMaterial::new(m.name.clone()), |material, (category, path)| {
            material.with_texture(category, path.clone())
        })
}
