//! GLB fetch and parse on a worker thread.
//!
//! A load resolves exactly once. Progress events are a side channel for the
//! status line only; the session acts on `Resolved` or `Failed`.

use crate::scene::SceneNode;
use gltf::mesh::util::ReadIndices;
use glam::{Mat4, Vec3};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Url(String),
    Path(PathBuf),
}

impl AssetSource {
    pub fn describe(&self) -> String {
        match self {
            AssetSource::Url(url) => url.clone(),
            AssetSource::Path(path) => path.display().to_string(),
        }
    }

    fn name(&self) -> String {
        let tail = match self {
            AssetSource::Url(url) => url.rsplit('/').next().unwrap_or(url.as_str()).to_string(),
            AssetSource::Path(path) => path
                .file_name()
                .and_then(|value| value.to_str())
                .unwrap_or("model")
                .to_string(),
        };
        if tail.is_empty() {
            "model".to_string()
        } else {
            tail
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse GLB {name}: {source}")]
    Gltf {
        name: String,
        #[source]
        source: gltf::Error,
    },
    #[error("{name} contains no triangle geometry")]
    NoGeometry { name: String },
    #[error("loader stopped before finishing")]
    Interrupted,
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress { loaded: u64, total: Option<u64> },
    Resolved(SceneNode),
    Failed(LoadError),
}

/// Handle to an outstanding load. There is no cancellation; dropping the
/// handle leaves the worker to finish and discard its result.
pub struct PendingLoad {
    receiver: Receiver<LoadEvent>,
    settled: bool,
}

impl PendingLoad {
    pub fn from_receiver(receiver: Receiver<LoadEvent>) -> Self {
        Self {
            receiver,
            settled: false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Next event if one is ready. Returns `None` forever once settled.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        if self.settled {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => {
                if matches!(event, LoadEvent::Resolved(_) | LoadEvent::Failed(_)) {
                    self.settled = true;
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.settled = true;
                Some(LoadEvent::Failed(LoadError::Interrupted))
            }
        }
    }
}

pub struct AssetLoader;

impl AssetLoader {
    pub fn spawn(source: AssetSource) -> PendingLoad {
        let (sender, receiver) = mpsc::channel();
        std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let event = match load(&source, &sender) {
                    Ok(node) => LoadEvent::Resolved(node),
                    Err(err) => LoadEvent::Failed(err),
                };
                // receiver gone means the session was torn down
                let _ = sender.send(event);
            })
            .map(|_| PendingLoad::from_receiver(receiver))
            .unwrap_or_else(|err| {
                log::warn!("failed to start loader thread: {}", err);
                let (_, receiver) = mpsc::channel();
                PendingLoad::from_receiver(receiver)
            })
    }
}

fn load(source: &AssetSource, progress: &Sender<LoadEvent>) -> Result<SceneNode, LoadError> {
    log::info!("Loading model: {}", source.describe());
    let bytes = match source {
        AssetSource::Url(url) => fetch_url(url, progress)?,
        AssetSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let len = bytes.len() as u64;
            let _ = progress.send(LoadEvent::Progress {
                loaded: len,
                total: Some(len),
            });
            bytes
        }
    };
    log::info!(
        "Fetched {} bytes (sha256 {})",
        bytes.len(),
        short_digest(&bytes)
    );
    parse_glb(&source.name(), &bytes)
}

fn fetch_url(url: &str, progress: &Sender<LoadEvent>) -> Result<Vec<u8>, LoadError> {
    let response = ureq::get(url).call().map_err(|source| LoadError::Http {
        url: url.to_string(),
        source: Box::new(source),
    })?;
    let total = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok());
    let mut reader = response.into_reader();
    let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(256 << 20) as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = reader.read(&mut chunk).map_err(|source| LoadError::Io {
            path: url.to_string(),
            source,
        })?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        let _ = progress.send(LoadEvent::Progress {
            loaded: bytes.len() as u64,
            total,
        });
    }
    Ok(bytes)
}

fn short_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Parses a binary glTF and merges every mesh primitive of the default scene
/// into one centred [`SceneNode`], with node transforms baked in.
pub fn parse_glb(name: &str, bytes: &[u8]) -> Result<SceneNode, LoadError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|source| LoadError::Gltf {
            name: name.to_string(),
            source,
        })?;

    let mut positions: Vec<Vec3> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut positions, &mut indices);
            }
        }
        None => {
            // no scene graph: take meshes as-is
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut positions, &mut indices);
            }
        }
    }

    let node = SceneNode::new(name.to_string(), positions, indices).ok_or_else(|| {
        LoadError::NoGeometry {
            name: name.to_string(),
        }
    })?;
    Ok(node.centered())
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    positions: &mut Vec<Vec3>,
    indices: &mut Vec<u32>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, positions, indices);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, positions, indices);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    positions: &mut Vec<Vec3>,
    indices: &mut Vec<u32>,
) {
    for prim in mesh.primitives() {
        if prim.mode() != gltf::mesh::Mode::Triangles {
            log::debug!("skipping non-triangle primitive in mesh {:?}", mesh.name());
            continue;
        }
        let reader = prim.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
        let Some(read_positions) = reader.read_positions() else {
            continue;
        };
        let start = positions.len() as u32;
        positions.extend(read_positions.map(|p| world.transform_point3(Vec3::from_array(p))));
        let count = positions.len() as u32 - start;
        match reader.read_indices() {
            Some(ReadIndices::U8(it)) => indices.extend(it.map(|v| start + v as u32)),
            Some(ReadIndices::U16(it)) => indices.extend(it.map(|v| start + v as u32)),
            Some(ReadIndices::U32(it)) => indices.extend(it.map(|v| start + v)),
            None => indices.extend(start..start + count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single triangle GLB with an optional node translation.
    fn triangle_glb(translation: [f32; 3]) -> Vec<u8> {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        let json = format!(
            concat!(
                r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"#,
                r#""nodes":[{{"mesh":0,"translation":[{},{},{}]}}],"#,
                r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],"#,
                r#""accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","#,
                r#""min":[0,0,0],"max":[2,2,0]}}],"#,
                r#""bufferViews":[{{"buffer":0,"byteLength":36}}],"#,
                r#""buffers":[{{"byteLength":36}}]}}"#
            ),
            translation[0], translation[1], translation[2]
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        glb.extend_from_slice(&bin);
        glb
    }

    #[test]
    fn glb_triangle_is_parsed_and_centered() {
        let node = parse_glb("tri.glb", &triangle_glb([0.0, 0.0, 0.0])).unwrap();
        assert_eq!(node.triangle_count(), 1);
        assert_eq!(node.indices, vec![0, 1, 2]);
        assert!(node.bounds.center().length() < 1e-5);
        let size = node.bounds.max - node.bounds.min;
        assert!((size - Vec3::new(2.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn node_transform_is_baked_before_centering() {
        let node = parse_glb("tri.glb", &triangle_glb([10.0, 0.0, 0.0])).unwrap();
        assert!(node.bounds.center().length() < 1e-5);
        assert!((node.positions[1] - Vec3::new(1.0, -1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn malformed_bytes_fail_to_parse() {
        let err = parse_glb("junk.glb", b"definitely not a model").unwrap_err();
        assert!(matches!(err, LoadError::Gltf { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut pending = AssetLoader::spawn(AssetSource::Path(dir.path().join("absent.glb")));
        let event = loop {
            if let Some(event) = pending.poll() {
                break event;
            }
            std::thread::yield_now();
        };
        assert!(matches!(event, LoadEvent::Failed(LoadError::Io { .. })));
        assert!(pending.is_settled());
        assert!(pending.poll().is_none());
    }

    #[test]
    fn local_file_loads_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.glb");
        std::fs::write(&path, triangle_glb([0.0, 0.0, 0.0])).unwrap();
        let mut pending = AssetLoader::spawn(AssetSource::Path(path));
        let mut saw_progress = false;
        let node = loop {
            match pending.poll() {
                Some(LoadEvent::Progress { loaded, total }) => {
                    assert_eq!(Some(loaded), total);
                    saw_progress = true;
                }
                Some(LoadEvent::Resolved(node)) => break node,
                Some(LoadEvent::Failed(err)) => panic!("load failed: {}", err),
                None => std::thread::yield_now(),
            }
        };
        assert!(saw_progress);
        assert_eq!(node.name, "tri.glb");
    }

    #[test]
    fn dropped_sender_settles_as_interrupted() {
        let (sender, receiver) = mpsc::channel();
        sender
            .send(LoadEvent::Progress {
                loaded: 1,
                total: None,
            })
            .unwrap();
        drop(sender);
        let mut pending = PendingLoad::from_receiver(receiver);
        assert!(matches!(pending.poll(), Some(LoadEvent::Progress { .. })));
        assert!(matches!(
            pending.poll(),
            Some(LoadEvent::Failed(LoadError::Interrupted))
        ));
        assert!(pending.poll().is_none());
    }

    #[test]
    fn source_names_come_from_the_last_segment() {
        let source = AssetSource::Url("https://cdn.example/models/smile.glb".to_string());
        assert_eq!(source.name(), "smile.glb");
        assert_eq!(AssetSource::Url("https://cdn.example/".to_string()).name(), "model");
    }
}
