//! Mesh data as loaded from disk and as uploaded to the GPU
//!
//! [`Mesh`] keeps the OBJ structure: separate position and normal arrays
//! addressed by per-face index triples. [`GeometryData`] is the flattened form
//! a [`GraphicsDevice`](crate::render::GraphicsDevice) consumes: one normal per
//! position and a plain `u32` index list.

use crate::foundation::math::Vec3;

/// One triangle: three position indices and three normal indices, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceIndex {
    /// Indices into [`Mesh::vertices`]
    pub positions: [u32; 3],
    /// Indices into [`Mesh::normals`]
    pub normals: [u32; 3],
}

/// Triangle mesh with separately indexed positions and normals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions in file order
    pub vertices: Vec<Vec3>,
    /// Vertex normals in file order
    pub normals: Vec<Vec3>,
    /// Triangles in file order
    pub faces: Vec<FaceIndex>,
}

impl Mesh {
    /// A mesh with no geometry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Translate every vertex by `offset`. Normals are unchanged.
    pub fn translate(&mut self, offset: Vec3) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            (min.inf(v), max.sup(v))
        }))
    }

    /// Flatten into upload-ready arrays
    ///
    /// Each position gets the normal named for it by the first face that
    /// references it. Positions no face references fall back to the normal
    /// stored at the same slot, or zero when there is none.
    pub fn to_geometry(&self) -> GeometryData {
        let positions: Vec<[f32; 3]> = self.vertices.iter().map(|v| [v.x, v.y, v.z]).collect();

        let mut resolved: Vec<Option<usize>> = vec![None; positions.len()];
        for face in &self.faces {
            for (&p, &n) in face.positions.iter().zip(&face.normals) {
                if let Some(slot @ None) = resolved.get_mut(p as usize) {
                    *slot = Some(n as usize);
                }
            }
        }

        let normals = resolved
            .iter()
            .enumerate()
            .map(|(i, &normal_index)| {
                normal_index
                    .or_else(|| (i < self.normals.len()).then_some(i))
                    .and_then(|n| self.normals.get(n))
                    .map_or([0.0; 3], |n| [n.x, n.y, n.z])
            })
            .collect();

        let indices = self.faces.iter().flat_map(|face| face.positions).collect();

        GeometryData { positions, normals, indices }
    }
}

/// Upload-ready geometry: parallel position/normal arrays plus triangle indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// One normal per position
    pub normals: Vec<[f32; 3]>,
    /// Triangle list indices into `positions`
    pub indices: Vec<u32>,
}

impl GeometryData {
    /// Whether there is nothing to upload
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

impl From<&Mesh> for GeometryData {
    fn from(mesh: &Mesh) -> Self {
        mesh.to_geometry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh {
            vertices: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            normals: vec![Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, -1.0)],
            faces: vec![FaceIndex { positions: [0, 1, 2], normals: [1, 1, 1] }],
        }
    }

    #[test]
    fn translate_there_and_back_restores_vertices() {
        let original = triangle();
        let mut mesh = original.clone();
        let offset = Vec3::new(2.5, -1.0, 7.25);
        mesh.translate(offset);
        assert_eq!(mesh.vertices[1], Vec3::new(3.5, -1.0, 7.25));
        mesh.translate(-offset);
        assert_eq!(mesh, original);
    }

    #[test]
    fn geometry_resolves_normals_through_faces() {
        let geometry = triangle().to_geometry();
        assert_eq!(geometry.vertex_count(), 3);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert!(geometry.normals.iter().all(|n| *n == [0.0, 0.0, -1.0]));
    }

    #[test]
    fn unreferenced_positions_fall_back_to_same_slot() {
        let mut mesh = triangle();
        mesh.faces.clear();
        let geometry = mesh.to_geometry();
        assert_eq!(geometry.normals, vec![[0.0, 0.0, 1.0], [0.0, 0.0, -1.0], [0.0, 0.0, 0.0]]);
        assert!(geometry.indices.is_empty());
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let (min, max) = triangle().bounds().unwrap();
        assert_eq!(min, Vec3::zeros());
        assert_eq!(max, Vec3::new(1.0, 1.0, 0.0));
        assert!(Mesh::empty().bounds().is_none());
    }
}
