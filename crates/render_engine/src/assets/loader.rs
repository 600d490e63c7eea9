//! Background asset loading
//!
//! Each request decodes on its own short-lived thread and sends the result
//! back over an `mpsc` channel. Completion callbacks are kept on the owning
//! thread and only run inside [`AssetLoader::poll`] (or
//! [`AssetLoader::wait_all`]), so they can mutate the context `C` without
//! any locking. Completion order across requests is unspecified.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::assets::{AssetError, HdrImage, ImageData, Model};
use crate::render::texture::{ColorSpace, TextureHandle, TextureStore};
use crate::scene::Scene;

/// Identifier of one load request
pub type LoadId = u64;

/// Result of a finished load
#[derive(Debug)]
pub enum LoadedAsset {
    /// 8-bit image
    Image(ImageData),
    /// Floating-point image
    Hdr(HdrImage),
    /// glTF model
    Model(Model),
}

impl LoadedAsset {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Hdr(_) => "hdr image",
            Self::Model(_) => "model",
        }
    }
}

/// Context that owns a texture store, so texture loads can fill it in
pub trait TextureSink {
    /// Store receiving decoded texture images
    fn texture_store(&mut self) -> &mut TextureStore;
}

impl TextureSink for Scene {
    fn texture_store(&mut self) -> &mut TextureStore {
        &mut self.textures
    }
}

impl TextureSink for TextureStore {
    fn texture_store(&mut self) -> &mut TextureStore {
        self
    }
}

type Completion<C> = Box<dyn FnOnce(&mut C, Result<LoadedAsset, AssetError>)>;
type Message = (LoadId, Result<LoadedAsset, AssetError>);

struct PendingLoad<C> {
    path: PathBuf,
    worker: Option<JoinHandle<()>>,
    on_complete: Completion<C>,
}

/// Asynchronous loader whose callbacks receive `&mut C`
pub struct AssetLoader<C> {
    root: PathBuf,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    pending: HashMap<LoadId, PendingLoad<C>>,
    next_id: LoadId,
}

impl<C> fmt::Debug for AssetLoader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLoader")
            .field("root", &self.root)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<C: 'static> AssetLoader<C> {
    /// Loader resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            root: root.into(),
            sender,
            receiver,
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    /// Asset root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of an asset
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Number of requests whose callbacks have not run yet
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn spawn(
        &mut self,
        relative: &Path,
        decode: fn(&Path) -> Result<LoadedAsset, AssetError>,
        on_complete: Completion<C>,
    ) -> LoadId {
        let id = self.next_id;
        self.next_id += 1;
        let path = self.resolve(relative);
        log::debug!("Queued load #{} for {:?}", id, path);

        let sender = self.sender.clone();
        let worker_path = path.clone();
        let worker = std::thread::Builder::new()
            .name(format!("asset-load-{id}"))
            .spawn(move || {
                let result = decode(&worker_path);
                // The loader may already be gone; nothing left to notify
                let _ = sender.send((id, result));
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(source) => {
                log::warn!("Could not start loader thread for {:?}: {}", path, source);
                let _ = self.sender.send((id, Err(AssetError::Io { path: path.clone(), source })));
                None
            }
        };

        self.pending.insert(id, PendingLoad { path, worker, on_complete });
        id
    }

    /// Load an 8-bit image
    pub fn load_image(
        &mut self,
        path: impl AsRef<Path>,
        on_complete: impl FnOnce(&mut C, Result<ImageData, AssetError>) + 'static,
    ) -> LoadId {
        let expected = "image";
        self.spawn(
            path.as_ref(),
            |p| ImageData::from_file(p).map(LoadedAsset::Image),
            Box::new(move |ctx: &mut C, result: Result<LoadedAsset, AssetError>| {
                on_complete(ctx, unpack(result, expected, |asset| match asset {
                    LoadedAsset::Image(image) => Ok(image),
                    other => Err(other),
                }));
            }),
        )
    }

    /// Load a floating-point image such as an equirectangular `.hdr`
    pub fn load_hdr(
        &mut self,
        path: impl AsRef<Path>,
        on_complete: impl FnOnce(&mut C, Result<HdrImage, AssetError>) + 'static,
    ) -> LoadId {
        let expected = "hdr image";
        self.spawn(
            path.as_ref(),
            |p| HdrImage::from_file(p).map(LoadedAsset::Hdr),
            Box::new(move |ctx: &mut C, result: Result<LoadedAsset, AssetError>| {
                on_complete(ctx, unpack(result, expected, |asset| match asset {
                    LoadedAsset::Hdr(image) => Ok(image),
                    other => Err(other),
                }));
            }),
        )
    }

    /// Load a `.gltf` or `.glb` model
    pub fn load_model(
        &mut self,
        path: impl AsRef<Path>,
        on_complete: impl FnOnce(&mut C, Result<Model, AssetError>) + 'static,
    ) -> LoadId {
        let expected = "model";
        self.spawn(
            path.as_ref(),
            |p| Model::from_file(p).map(LoadedAsset::Model),
            Box::new(move |ctx: &mut C, result: Result<LoadedAsset, AssetError>| {
                on_complete(ctx, unpack(result, expected, |asset| match asset {
                    LoadedAsset::Model(model) => Ok(model),
                    other => Err(other),
                }));
            }),
        )
    }

    /// Run callbacks for every load that has finished; never blocks
    ///
    /// Returns the number of callbacks run.
    pub fn poll(&mut self, ctx: &mut C) -> usize {
        // Workers that were finished before draining and still have no
        // message after it died without sending one
        let finished: Vec<LoadId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.worker.as_ref().is_some_and(JoinHandle::is_finished))
            .map(|(&id, _)| id)
            .collect();

        let mut completed = 0;
        while let Ok((id, result)) = self.receiver.try_recv() {
            completed += usize::from(self.complete(ctx, id, result));
        }

        for id in finished {
            if let Some(path) = self.pending.get(&id).map(|p| p.path.clone()) {
                log::warn!("Loader worker for {:?} exited without a result", path);
                completed += usize::from(self.complete(ctx, id, Err(AssetError::WorkerDisconnected(path))));
            }
        }
        completed
    }

    /// Block until every pending load has completed or `timeout` elapses
    ///
    /// Returns the number of callbacks run.
    pub fn wait_all(&mut self, ctx: &mut C, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut completed = self.poll(ctx);
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("Gave up waiting for {} asset load(s)", self.pending.len());
                break;
            }
            match self.receiver.recv_timeout(remaining.min(Duration::from_millis(50))) {
                Ok((id, result)) => completed += usize::from(self.complete(ctx, id, result)),
                Err(RecvTimeoutError::Timeout) => completed += self.poll(ctx),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        completed
    }

    fn complete(&mut self, ctx: &mut C, id: LoadId, result: Result<LoadedAsset, AssetError>) -> bool {
        let Some(pending) = self.pending.remove(&id) else {
            return false;
        };
        if let Some(worker) = pending.worker {
            // Already finished or about to; only panics are reported here
            if worker.join().is_err() {
                log::warn!("Loader worker for {:?} panicked", pending.path);
            }
        }
        match &result {
            Ok(asset) => log::debug!("Load #{} of {:?} finished ({})", id, pending.path, asset.kind()),
            Err(err) => log::debug!("Load #{} of {:?} failed: {}", id, pending.path, err),
        }
        (pending.on_complete)(ctx, result);
        true
    }
}

impl<C: TextureSink + 'static> AssetLoader<C> {
    /// Register a texture in `textures` now and fill in its image when the
    /// load completes
    ///
    /// `textures` must be the store that `C` exposes through [`TextureSink`].
    /// The handle can be assigned to materials immediately. A failed load
    /// leaves the texture empty and logs a warning.
    pub fn load_texture(
        &mut self,
        textures: &mut TextureStore,
        path: impl AsRef<Path>,
        color_space: ColorSpace,
    ) -> TextureHandle {
        let path = path.as_ref();
        let handle = textures.reserve(path.to_string_lossy(), color_space);
        self.load_image(path, move |ctx: &mut C, result| match result {
            Ok(image) => {
                if !ctx.texture_store().fulfill(handle, image) {
                    log::warn!("Texture {:?} was dropped before its image arrived", handle);
                }
            }
            Err(err) => log::warn!("Texture load failed: {}", err),
        });
        handle
    }
}

fn unpack<T>(
    result: Result<LoadedAsset, AssetError>,
    expected: &'static str,
    select: impl FnOnce(LoadedAsset) -> Result<T, LoadedAsset>,
) -> Result<T, AssetError> {
    let asset = result?;
    select(asset).map_err(|other| AssetError::UnexpectedAsset {
        path: PathBuf::new(),
        expected,
        found: other.kind(),
    })
}
