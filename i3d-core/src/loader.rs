/// Format loaders and the tag -> loader registry
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::stl;

/// Bytes that arrive later, e.g. a browser `File` being read
pub type DeferredBytes = Shared<LocalBoxFuture<'static, Result<Arc<[u8]>, String>>>;

/// Where the bytes of a model come from
#[derive(Clone)]
pub enum ModelSource {
    /// In-memory bytes
    Bytes { name: String, data: Arc<[u8]> },
    /// A file on the local filesystem
    Path(PathBuf),
    /// Bytes still being fetched; the loader awaits them
    Deferred { name: String, data: DeferredBytes },
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            ModelSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ModelSource::Deferred { name, .. } => {
                f.debug_struct("Deferred").field("name", name).finish()
            }
        }
    }
}

impl ModelSource {
    pub fn bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        ModelSource::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        ModelSource::Path(path.into())
    }

    /// A source named `name` whose bytes are produced by `fetch`.
    ///
    /// `fetch` is not polled until a loader reads the source.
    pub fn deferred<F, B>(name: impl Into<String>, fetch: F) -> Self
    where
        F: Future<Output = Result<B, String>> + 'static,
        B: Into<Arc<[u8]>> + 'static,
    {
        let fetch = async move { fetch.await.map(Into::<Arc<[u8]>>::into) };
        ModelSource::Deferred {
            name: name.into(),
            data: fetch.boxed_local().shared(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ModelSource::Bytes { name, .. } | ModelSource::Deferred { name, .. } => name.clone(),
            ModelSource::Path(path) => path.display().to_string(),
        }
    }

    /// Format tag guessed from the file extension
    pub fn format(&self) -> Option<String> {
        match self {
            ModelSource::Bytes { name, .. } | ModelSource::Deferred { name, .. } => {
                format_from_path(Path::new(name))
            }
            ModelSource::Path(path) => format_from_path(path),
        }
    }

    /// Resolve the source to its bytes
    pub async fn read(&self) -> Result<Arc<[u8]>, LoadError> {
        match self {
            ModelSource::Bytes { data, .. } => Ok(Arc::clone(data)),
            ModelSource::Path(path) => Ok(std::fs::read(path)?.into()),
            ModelSource::Deferred { data, .. } => data.clone().await.map_err(LoadError::Fetch),
        }
    }
}

/// Lower-cased extension of `path`, used as a format tag
pub fn format_from_path(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Converts a model source into a mesh, asynchronously
pub trait FormatLoader {
    fn load(&self, source: ModelSource) -> LocalBoxFuture<'static, Result<Mesh, LoadError>>;
}

/// Loader for binary and ASCII STL
#[derive(Debug, Clone, Copy, Default)]
pub struct StlLoader;

impl FormatLoader for StlLoader {
    fn load(&self, source: ModelSource) -> LocalBoxFuture<'static, Result<Mesh, LoadError>> {
        async move {
            let data = source.read().await?;
            let mesh = stl::parse_stl(&data)?;
            log::debug!(
                "parsed {} triangles from {}",
                mesh.triangles.len(),
                source.name()
            );
            Ok(mesh)
        }
        .boxed_local()
    }
}

/// Result of looking a format tag up in a [`LoaderRegistry`]
pub enum LoaderLookup<'a> {
    Found(&'a dyn FormatLoader),
    Unsupported,
}

/// Mapping from format tag to loader
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<dyn FormatLoader>>,
}

impl LoaderRegistry {
    /// A registry with no formats at all
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register `loader` for `format`, replacing any previous one
    pub fn register(&mut self, format: &str, loader: Box<dyn FormatLoader>) {
        self.loaders.insert(format.to_ascii_lowercase(), loader);
    }

    pub fn lookup(&self, format: &str) -> LoaderLookup<'_> {
        match self.loaders.get(&format.to_ascii_lowercase()) {
            Some(loader) => LoaderLookup::Found(loader.as_ref()),
            None => LoaderLookup::Unsupported,
        }
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("stl", Box::new(StlLoader));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn cube_stl() -> Vec<u8> {
        let mut data = vec![0u8; 80];
        let mesh = Mesh::cube(2.0);
        data.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());
        for triangle in &mesh.triangles {
            let n = triangle.vertices[0].normal;
            for c in n.iter() {
                data.extend_from_slice(&c.to_le_bytes());
            }
            for vertex in &triangle.vertices {
                for c in vertex.position.coords.iter() {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = LoaderRegistry::default();
        assert!(matches!(registry.lookup("STL"), LoaderLookup::Found(_)));
        assert!(matches!(registry.lookup("obj"), LoaderLookup::Unsupported));
        assert_eq!(registry.formats().collect::<Vec<_>>(), vec!["stl"]);
    }

    #[test]
    fn test_format_from_source_name() {
        let source = ModelSource::bytes("Part.STL", Vec::<u8>::new());
        assert_eq!(source.format().as_deref(), Some("stl"));
        assert_eq!(ModelSource::path("model").format(), None);
    }

    #[test]
    fn test_stl_loader_reads_bytes() {
        let source = ModelSource::bytes("cube.stl", cube_stl());
        let mesh = block_on(StlLoader.load(source)).unwrap();
        assert_eq!(mesh, Mesh::cube(2.0));
    }

    #[test]
    fn test_stl_loader_awaits_deferred_bytes() {
        let (tx, rx) = futures::channel::oneshot::channel::<Vec<u8>>();
        let source = ModelSource::deferred("cube.stl", async move {
            rx.await.map_err(|err| err.to_string())
        });
        assert_eq!(source.format().as_deref(), Some("stl"));

        let load = StlLoader.load(source);
        tx.send(cube_stl()).unwrap();
        assert_eq!(block_on(load).unwrap(), Mesh::cube(2.0));
    }

    #[test]
    fn test_deferred_fetch_failure_is_a_load_error() {
        let source = ModelSource::deferred("cube.stl", async {
            Err::<Vec<u8>, _>("read aborted".to_string())
        });
        let err = block_on(StlLoader.load(source)).unwrap_err();
        assert!(matches!(err, LoadError::Fetch(ref msg) if msg == "read aborted"));
    }

    #[test]
    fn test_stl_loader_reports_missing_file() {
        let source = ModelSource::path("/definitely/not/here.stl");
        let err = block_on(StlLoader.load(source)).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
