//! OBJ file loader for point-cloud and light-proxy meshes
//!
//! Understands the subset the viewer's models use: `v x y z`, `vn x y z` and
//! triangular faces written as `f a//na b//nb c//nc`. Every other line is
//! skipped. Indices are range-checked once the whole file has been read, so
//! faces may reference vertices defined further down.

use crate::foundation::math::Vec3;
use crate::render::primitives::mesh::{FaceIndex, Mesh};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures while reading an OBJ file
#[derive(Error, Debug)]
pub enum ObjError {
    #[error("cannot open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed OBJ at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl ObjError {
    fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed { line, reason: reason.into() }
    }
}

/// Parser for the `v`/`vn`/`f a//n` OBJ subset
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file into a mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ObjError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mesh = Self::parse(BufReader::new(file))?;
        log::debug!(
            "Loaded {}: {} vertices, {} normals, {} faces",
            path.display(),
            mesh.vertices.len(),
            mesh.normals.len(),
            mesh.faces.len()
        );
        Ok(mesh)
    }

    /// Load an OBJ file and translate every vertex by `offset`
    pub fn load_obj_with_offset<P: AsRef<Path>>(path: P, offset: Vec3) -> Result<Mesh, ObjError> {
        let mut mesh = Self::load_obj(path)?;
        mesh.translate(offset);
        Ok(mesh)
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Mesh, ObjError> {
        let mut mesh = Mesh::empty();
        // Source line of each face, for range errors reported after the read.
        let mut face_lines = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line?;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => mesh.vertices.push(parse_vec3(parts, line_number, "vertex")?),
                Some("vn") => mesh.normals.push(parse_vec3(parts, line_number, "normal")?),
                Some("f") => {
                    mesh.faces.push(parse_face(parts, line_number)?);
                    face_lines.push(line_number);
                }
                _ => {}
            }
        }

        validate_faces(&mesh, &face_lines)?;
        Ok(mesh)
    }
}

fn parse_vec3<'a>(
    mut parts: impl Iterator<Item = &'a str>,
    line: usize,
    kind: &str,
) -> Result<Vec3, ObjError> {
    let mut coords = [0.0f32; 3];
    for (axis, coord) in ["x", "y", "z"].iter().zip(coords.iter_mut()) {
        let token = parts
            .next()
            .ok_or_else(|| ObjError::malformed(line, format!("{kind} is missing its {axis} coordinate")))?;
        *coord = token
            .parse()
            .map_err(|_| ObjError::malformed(line, format!("invalid {kind} {axis} coordinate '{token}'")))?;
    }
    Ok(Vec3::from(coords))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>, line: usize) -> Result<FaceIndex, ObjError> {
    let corners: Vec<&str> = parts.collect();
    if corners.len() != 3 {
        return Err(ObjError::malformed(
            line,
            format!("face has {} corners, only triangles are supported", corners.len()),
        ));
    }

    let mut face = FaceIndex { positions: [0; 3], normals: [0; 3] };
    for (i, corner) in corners.iter().enumerate() {
        let (position, normal) = corner
            .split_once("//")
            .ok_or_else(|| ObjError::malformed(line, format!("face corner '{corner}' is not of the form p//n")))?;
        face.positions[i] = parse_index(position, line)?;
        face.normals[i] = parse_index(normal, line)?;
    }
    Ok(face)
}

/// Parse a 1-based OBJ index and return it 0-based
fn parse_index(token: &str, line: usize) -> Result<u32, ObjError> {
    match token.parse::<u32>() {
        Ok(0) | Err(_) => Err(ObjError::malformed(line, format!("invalid face index '{token}'"))),
        Ok(index) => Ok(index - 1),
    }
}

fn validate_faces(mesh: &Mesh, face_lines: &[usize]) -> Result<(), ObjError> {
    let vertex_count = mesh.vertices.len();
    let normal_count = mesh.normals.len();

    for (face, &line) in mesh.faces.iter().zip(face_lines) {
        if let Some(&p) = face.positions.iter().find(|&&p| p as usize >= vertex_count) {
            return Err(ObjError::malformed(
                line,
                format!("vertex index {} out of range ({} vertices)", p + 1, vertex_count),
            ));
        }
        if let Some(&n) = face.normals.iter().find(|&&n| n as usize >= normal_count) {
            return Err(ObjError::malformed(
                line,
                format!("normal index {} out of range ({} normals)", n + 1, normal_count),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TRIANGLE: &str = "\
# single triangle
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
";

    fn parse(text: &str) -> Result<Mesh, ObjError> {
        ObjLoader::parse(Cursor::new(text))
    }

    fn assert_malformed_at(text: &str, expected_line: usize) {
        match parse(text) {
            Err(ObjError::Malformed { line, .. }) => assert_eq!(line, expected_line),
            other => panic!("expected Malformed at line {expected_line}, got {other:?}"),
        }
    }

    #[test]
    fn triangle_counts_and_zero_based_indices() {
        let mesh = parse(TRIANGLE).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.normals.len(), 1);
        assert_eq!(mesh.faces, vec![FaceIndex { positions: [0, 1, 2], normals: [0, 0, 0] }]);
        assert_eq!(mesh.vertices[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn normal_indices_are_decremented_like_positions() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 1\nvn 0 0 1\nf 1//1 2//2 3//3\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.normals.len(), 3);
        assert_eq!(mesh.faces, vec![FaceIndex { positions: [0, 1, 2], normals: [0, 1, 2] }]);
    }

    #[test]
    fn blank_and_unknown_lines_are_ignored() {
        let text = "o thing\n\nvt 0.5 0.5\nusemtl none\nv 1 2 3\n   \ns off\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices, vec![Vec3::new(1.0, 2.0, 3.0)]);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn faces_may_reference_later_vertices() {
        let text = "vn 0 1 0\nf 1//1 2//1 3//1\nv 0 0 0\nv 1 0 0\nv 0 0 1\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn quad_faces_are_rejected() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n";
        assert_malformed_at(text, 6);
    }

    #[test]
    fn corner_without_double_slash_is_rejected() {
        assert_malformed_at("v 0 0 0\nvn 0 0 1\nf 1/1/1 1//1 1//1\n", 3);
    }

    #[test]
    fn zero_and_negative_indices_are_rejected() {
        assert_malformed_at("v 0 0 0\nvn 0 0 1\nf 0//1 1//1 1//1\n", 3);
        assert_malformed_at("v 0 0 0\nvn 0 0 1\nf -1//1 1//1 1//1\n", 3);
    }

    #[test]
    fn out_of_range_index_reports_face_line() {
        assert_malformed_at("v 0 0 0\nvn 0 0 1\nf 1//1 1//1 2//1\n", 3);
        assert_malformed_at("v 0 0 0\nvn 0 0 1\nf 1//1 1//2 1//1\n", 3);
    }

    #[test]
    fn missing_coordinate_is_rejected() {
        assert_malformed_at("v 0 0 0\nv 1 2\n", 2);
        assert_malformed_at("vn 0 zero 1\n", 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let path = std::env::temp_dir().join("splat_engine_definitely_missing.obj");
        match ObjLoader::load_obj(&path) {
            Err(ObjError::FileOpen { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected FileOpen, got {other:?}"),
        }
    }

    #[test]
    fn offset_translates_loaded_vertices() {
        let path = std::env::temp_dir().join(format!("splat_engine_offset_{}.obj", std::process::id()));
        std::fs::write(&path, TRIANGLE).unwrap();
        let offset = Vec3::new(2.0, -3.0, 4.0);
        let mesh = ObjLoader::load_obj_with_offset(&path, offset).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(mesh.vertices[0], offset);
        assert_eq!(mesh.vertices[2], Vec3::new(2.0, -2.0, 4.0));
        assert_eq!(mesh.normals[0], Vec3::new(0.0, 0.0, 1.0));
    }
}
