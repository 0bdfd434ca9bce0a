//! Where asset bytes come from. Requests never block the caller: each returns a [`Pending`]
//! that is polled once per frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use tracing::debug;

use crate::asset::{AnimationAsset, ModelAsset};
use crate::texture::{TextureAsset, decode_texture};
use crate::{LoadError, Result, parse_animation, parse_model, procedural};

/// A request in flight.
#[derive(Debug)]
pub struct Pending<T> {
    url: String,
    rx: Receiver<Result<T>>,
}

impl<T> Pending<T> {
    fn channel(url: &str) -> (Sender<Result<T>>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                url: url.to_string(),
                rx,
            },
        )
    }

    /// A request that is already complete.
    pub fn ready(url: &str, result: Result<T>) -> Self {
        let (tx, pending) = Self::channel(url);
        let _ = tx.send(result);
        pending
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `None` while the request is still running.
    pub fn try_take(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoadError::FetchFailed {
                url: self.url.clone(),
                reason: "request was abandoned".to_string(),
            })),
        }
    }
}

pub trait AssetSource {
    fn request_model(&mut self, url: &str) -> Pending<ModelAsset>;
    fn request_animation(&mut self, url: &str) -> Pending<AnimationAsset>;
    fn request_texture(&mut self, url: &str) -> Pending<TextureAsset>;
}

/// Blocking byte retrieval, run on a worker thread.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Directory that relative buffer URIs inside `url` resolve against.
    fn base_dir(&self, _url: &str) -> Option<PathBuf> {
        None
    }
}

fn fetch_failed(url: &str, reason: impl std::fmt::Display) -> LoadError {
    LoadError::FetchFailed {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Reads local files. `file://` URLs and plain paths are accepted; relative paths resolve
/// against `root` when one is set.
#[derive(Clone, Debug, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if is_remote(url) {
            return Err(fetch_failed(url, "built without HTTP support"));
        }
        let path = self.resolve(url);
        std::fs::read(&path).map_err(|err| fetch_failed(url, format!("{}: {err}", path.display())))
    }

    fn base_dir(&self, url: &str) -> Option<PathBuf> {
        if is_remote(url) {
            return None;
        }
        self.resolve(url).parent().map(Path::to_path_buf)
    }
}

/// HTTP(S) with `reqwest`; anything else goes to the wrapped [`FileFetcher`].
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    files: FileFetcher,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(files: FileFetcher) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            files,
        }
    }
}

#[cfg(feature = "http")]
impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if !is_remote(url) {
            return self.files.fetch(url);
        }
        let response = self.client.get(url).send().map_err(|err| fetch_failed(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(url, format!("HTTP {status}")));
        }
        let bytes = response.bytes().map_err(|err| fetch_failed(url, err))?;
        Ok(bytes.to_vec())
    }

    fn base_dir(&self, url: &str) -> Option<PathBuf> {
        self.files.base_dir(url)
    }
}

/// Fetches and parses each request on its own worker thread. `procedural://` URLs are built
/// in place.
#[derive(Clone)]
pub struct FetchingSource {
    fetcher: Arc<dyn Fetcher>,
}

impl FetchingSource {
    pub fn new(fetcher: impl Fetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    fn spawn<T, F>(&self, url: &str, parse: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&[u8], Option<&Path>, &str) -> Result<T> + Send + 'static,
    {
        let (tx, pending) = Pending::channel(url);
        let fetcher = Arc::clone(&self.fetcher);
        let url = url.to_string();
        thread::spawn(move || {
            let result = fetcher.fetch(&url).and_then(|bytes| {
                let base = fetcher.base_dir(&url);
                parse(&bytes, base.as_deref(), &url)
            });
            if tx.send(result).is_err() {
                debug!(url = %url, "request dropped before completion");
            }
        });
        pending
    }
}

impl AssetSource for FetchingSource {
    fn request_model(&mut self, url: &str) -> Pending<ModelAsset> {
        match procedural::model(url) {
            Some(result) => Pending::ready(url, result),
            None => self.spawn(url, parse_model),
        }
    }

    fn request_animation(&mut self, url: &str) -> Pending<AnimationAsset> {
        match procedural::animation(url) {
            Some(result) => Pending::ready(url, result),
            None => self.spawn(url, parse_animation),
        }
    }

    fn request_texture(&mut self, url: &str) -> Pending<TextureAsset> {
        self.spawn(url, |bytes, _base, url| decode_texture(bytes, url))
    }
}

#[derive(Clone, Debug)]
enum Scripted {
    Model(ModelAsset),
    Animation(AnimationAsset),
    Texture(TextureAsset),
    Fail(LoadError),
}

#[derive(Debug)]
enum Reply {
    Model(Sender<Result<ModelAsset>>),
    Animation(Sender<Result<AnimationAsset>>),
    Texture(Sender<Result<TextureAsset>>),
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, Scripted>,
    waiting: Vec<(String, Reply)>,
    requested: Vec<String>,
}

/// Answers requests only when told to, in whatever order the caller chooses. Clones share
/// state, so a test keeps one handle while the viewer owns another.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    script: Rc<RefCell<Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn respond(&self, url: &str, scripted: Scripted) {
        self.script
            .borrow_mut()
            .responses
            .insert(url.to_string(), scripted);
    }

    pub fn add_model(&self, url: &str, asset: ModelAsset) {
        self.respond(url, Scripted::Model(asset));
    }

    pub fn add_animation(&self, url: &str, asset: AnimationAsset) {
        self.respond(url, Scripted::Animation(asset));
    }

    pub fn add_texture(&self, url: &str, asset: TextureAsset) {
        self.respond(url, Scripted::Texture(asset));
    }

    pub fn add_failure(&self, url: &str, error: LoadError) {
        self.respond(url, Scripted::Fail(error));
    }

    /// URLs still waiting for an answer, oldest first.
    pub fn pending(&self) -> Vec<String> {
        self.script
            .borrow()
            .waiting
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Every URL requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.script.borrow().requested.clone()
    }

    /// Answers the oldest waiting request for `url`. Returns false when none is waiting.
    pub fn resolve(&self, url: &str) -> bool {
        let mut script = self.script.borrow_mut();
        let Some(position) = script.waiting.iter().position(|(waiting, _)| waiting == url) else {
            return false;
        };
        let (_, reply) = script.waiting.remove(position);
        let scripted = script.responses.get(url).cloned();
        drop(script);
        answer(url, reply, scripted);
        true
    }

    /// Answers everything waiting, oldest first.
    pub fn resolve_all(&self) -> usize {
        let mut count = 0;
        while let Some(url) = self.pending().into_iter().next() {
            self.resolve(&url);
            count += 1;
        }
        count
    }

    fn enqueue(&self, url: &str, reply: Reply) {
        let mut script = self.script.borrow_mut();
        script.requested.push(url.to_string());
        script.waiting.push((url.to_string(), reply));
    }
}

fn answer(url: &str, reply: Reply, scripted: Option<Scripted>) {
    let missing = || fetch_failed(url, "404 not found");
    let wrong_kind = || LoadError::UnsupportedFormat {
        url: url.to_string(),
    };
    let delivered = match (reply, scripted) {
        (Reply::Model(tx), Some(Scripted::Model(asset))) => tx.send(Ok(asset)).is_ok(),
        (Reply::Model(tx), Some(Scripted::Fail(err))) => tx.send(Err(err)).is_ok(),
        (Reply::Model(tx), None) => tx.send(Err(missing())).is_ok(),
        (Reply::Model(tx), Some(_)) => tx.send(Err(wrong_kind())).is_ok(),
        (Reply::Animation(tx), Some(Scripted::Animation(asset))) => tx.send(Ok(asset)).is_ok(),
        (Reply::Animation(tx), Some(Scripted::Fail(err))) => tx.send(Err(err)).is_ok(),
        (Reply::Animation(tx), None) => tx.send(Err(missing())).is_ok(),
        (Reply::Animation(tx), Some(_)) => tx.send(Err(wrong_kind())).is_ok(),
        (Reply::Texture(tx), Some(Scripted::Texture(asset))) => tx.send(Ok(asset)).is_ok(),
        (Reply::Texture(tx), Some(Scripted::Fail(err))) => tx.send(Err(err)).is_ok(),
        (Reply::Texture(tx), None) => tx.send(Err(missing())).is_ok(),
        (Reply::Texture(tx), Some(_)) => tx.send(Err(wrong_kind())).is_ok(),
    };
    if !delivered {
        debug!(url, "requester dropped before the scripted answer");
    }
}

impl AssetSource for ScriptedSource {
    fn request_model(&mut self, url: &str) -> Pending<ModelAsset> {
        let (tx, pending) = Pending::channel(url);
        self.enqueue(url, Reply::Model(tx));
        pending
    }

    fn request_animation(&mut self, url: &str) -> Pending<AnimationAsset> {
        let (tx, pending) = Pending::channel(url);
        self.enqueue(url, Reply::Animation(tx));
        pending
    }

    fn request_texture(&mut self, url: &str) -> Pending<TextureAsset> {
        let (tx, pending) = Pending::channel(url);
        self.enqueue(url, Reply::Texture(tx));
        pending
    }
}
