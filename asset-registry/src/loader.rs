use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::asset::{Asset, Payload, PayloadDecoder};
use crate::bundle::Bundle;
use crate::error::LoadError;
use crate::location::ResolvedKey;
use crate::resolver::ResolvedTarget;
use crate::services::DecryptService;

pub const DEFAULT_STREAM_CHUNK_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Pending,
    Loading,
    Succeeded,
    Failed,
}

impl LoaderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoaderState::Succeeded | LoaderState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoaderState::Pending => "pending",
            LoaderState::Loading => "loading",
            LoaderState::Succeeded => "succeeded",
            LoaderState::Failed => "failed",
        }
    }
}

/// Per-call services handed down by the registry.
pub(crate) struct LoadContext<'a> {
    pub(crate) decrypt: Option<&'a dyn DecryptService>,
    pub(crate) chunk_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadRole {
    Direct,
    Dependency,
    MainBundle,
}

/// One file being read a chunk at a time.
struct StreamRead {
    path: PathBuf,
    role: ReadRole,
    file: File,
    len: u64,
    buf: Vec<u8>,
}

impl StreamRead {
    fn open(path: PathBuf, role: ReadRole) -> Result<Self, LoadError> {
        let file = File::open(&path).map_err(|e| LoadError::io(&path, e))?;
        let meta = file.metadata().map_err(|e| LoadError::io(&path, e))?;
        if meta.is_dir() {
            return Err(LoadError::io(&path, "is a directory"));
        }
        Ok(StreamRead {
            path,
            role,
            file,
            len: meta.len(),
            buf: Vec::new(),
        })
    }

    /// Read up to `chunk` more bytes; true once the whole file is buffered.
    fn read_chunk(&mut self, chunk: usize) -> Result<bool, LoadError> {
        let remaining = self.len.saturating_sub(self.buf.len() as u64);
        if remaining > 0 {
            let want = remaining.min(chunk.max(1) as u64) as usize;
            let start = self.buf.len();
            self.buf.resize(start + want, 0);
            self.file
                .read_exact(&mut self.buf[start..])
                .map_err(|e| LoadError::io(&self.path, e))?;
        }
        Ok(self.buf.len() as u64 >= self.len)
    }
}

/// Async plan: files still to open (dependencies first, main last) and the
/// read in progress.
struct StreamJob {
    queue: VecDeque<(PathBuf, ReadRole)>,
    current: Option<StreamRead>,
    asset_name: Option<String>,
}

impl StreamJob {
    fn plan(target: ResolvedTarget) -> Self {
        let mut queue = VecDeque::new();
        let asset_name = match target {
            ResolvedTarget::Direct(path) => {
                queue.push_back((path, ReadRole::Direct));
                None
            }
            ResolvedTarget::Bundle(t) => {
                for dep in t.dependencies {
                    queue.push_back((dep, ReadRole::Dependency));
                }
                queue.push_back((t.bundle_path, ReadRole::MainBundle));
                Some(t.asset_name)
            }
        };
        StreamJob {
            queue,
            current: None,
            asset_name,
        }
    }

    fn open_next(&mut self) -> Result<bool, LoadError> {
        match self.queue.pop_front() {
            Some((path, role)) => {
                self.current = Some(StreamRead::open(path, role)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Lifecycle of one resolved resource: `Pending -> Loading -> {Succeeded, Failed}`.
///
/// The loader exclusively owns its bundle handles and the decoded payload;
/// callers only ever get shared references to the payload.
pub struct Loader {
    key: ResolvedKey,
    state: LoaderState,
    ref_count: u32,
    decoder: PayloadDecoder,
    payload: Option<Payload>,
    bundle: Option<Bundle>,
    dependencies: Vec<Bundle>,
    stream: Option<StreamJob>,
    error: Option<LoadError>,
}

impl Loader {
    pub(crate) fn new(key: ResolvedKey, decoder: PayloadDecoder) -> Self {
        Loader {
            key,
            state: LoaderState::Pending,
            ref_count: 0,
            decoder,
            payload: None,
            bundle: None,
            dependencies: Vec::new(),
            stream: None,
            error: None,
        }
    }

    pub fn key(&self) -> &ResolvedKey {
        &self.key
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// Tag of the asset type this loader decodes into.
    pub fn type_name(&self) -> &'static str {
        self.decoder.type_name()
    }

    /// Number of bundles (main plus dependencies) currently held open.
    pub fn open_bundle_count(&self) -> usize {
        self.dependencies.len() + usize::from(self.bundle.is_some())
    }

    /// Zero references and a terminal state.
    pub fn is_evictable(&self) -> bool {
        self.ref_count == 0 && self.state.is_terminal()
    }

    pub(crate) fn serves<T: Asset>(&self) -> bool {
        self.decoder.is::<T>()
    }

    pub(crate) fn acquire(&mut self) {
        self.ref_count += 1;
    }

    /// Unbalanced releases saturate at zero.
    pub(crate) fn release(&mut self) {
        if self.ref_count == 0 {
            tracing::trace!(key = %self.key, "release on loader with no references");
        }
        self.ref_count = self.ref_count.saturating_sub(1);
    }

    /// `None` while unfinished.
    pub(crate) fn outcome<T: Asset>(&self) -> Option<Result<Arc<T>, LoadError>> {
        match self.state {
            LoaderState::Pending | LoaderState::Loading => None,
            LoaderState::Failed => Some(Err(self
                .error
                .clone()
                .unwrap_or_else(|| LoadError::resolution(&self.key, "load failed")))),
            LoaderState::Succeeded => Some(
                self.payload
                    .clone()
                    .ok_or_else(|| LoadError::resolution(&self.key, "payload missing"))
                    .and_then(|p| {
                        p.downcast::<T>().map_err(|_| {
                            LoadError::type_mismatch(&self.key, T::TYPE_NAME, self.decoder.type_name())
                        })
                    }),
            ),
        }
    }

    /// Synchronous path: runs the whole load inside the call. Dependency
    /// bundles are not loaded here.
    pub(crate) fn load_blocking(&mut self, target: ResolvedTarget, ctx: &LoadContext<'_>) {
        self.state = LoaderState::Loading;
        let result = match target {
            ResolvedTarget::Direct(path) => std::fs::read(&path)
                .map_err(|e| LoadError::io(&path, e))
                .and_then(|bytes| self.decode(&bytes))
                .map(|payload| (payload, None)),
            ResolvedTarget::Bundle(t) => {
                if !t.dependencies.is_empty() {
                    tracing::debug!(
                        key = %self.key,
                        dependencies = t.dependencies.len(),
                        "synchronous load ignores dependency bundles"
                    );
                }
                self.open_bundle(&t.bundle_path, ctx).and_then(|bundle| {
                    let payload = self.extract(&bundle, &t.asset_name, &t.bundle_path)?;
                    Ok((payload, Some(bundle)))
                })
            }
        };
        match result {
            Ok((payload, bundle)) => self.succeed(payload, bundle),
            Err(err) => self.fail(err),
        }
    }

    /// Asynchronous path: records the plan, I/O starts on the next step.
    pub(crate) fn start_stream(&mut self, target: ResolvedTarget) {
        self.stream = Some(StreamJob::plan(target));
    }

    /// Advance by one unit of work. Returns false when there was nothing to do.
    pub(crate) fn step(&mut self, ctx: &LoadContext<'_>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let result = match self.state {
            LoaderState::Pending => self.begin_stream(),
            _ => self.advance_stream(ctx),
        };
        if let Err(err) = result {
            self.fail(err);
        }
        true
    }

    /// Drive an in-flight asynchronous load to completion inside the call.
    pub(crate) fn complete_blocking(&mut self, ctx: &LoadContext<'_>) {
        while !self.state.is_terminal() {
            self.step(ctx);
        }
    }

    fn begin_stream(&mut self) -> Result<(), LoadError> {
        let job = self
            .stream
            .as_mut()
            .ok_or_else(|| LoadError::resolution(&self.key, "no load was issued"))?;
        self.state = LoaderState::Loading;
        if !job.open_next()? {
            return Err(LoadError::resolution(&self.key, "nothing to read"));
        }
        tracing::debug!(key = %self.key, "load issued");
        Ok(())
    }

    fn advance_stream(&mut self, ctx: &LoadContext<'_>) -> Result<(), LoadError> {
        let mut job = self
            .stream
            .take()
            .ok_or_else(|| LoadError::resolution(&self.key, "no load in progress"))?;
        let mut read = job
            .current
            .take()
            .ok_or_else(|| LoadError::resolution(&self.key, "no file open"))?;

        if !read.read_chunk(ctx.chunk_bytes)? {
            job.current = Some(read);
            self.stream = Some(job);
            return Ok(());
        }

        let StreamRead { path, role, buf, .. } = read;
        match role {
            ReadRole::Direct => {
                let payload = self.decode(&buf)?;
                self.succeed(payload, None);
            }
            ReadRole::Dependency => {
                let bundle = self.bundle_from_bytes(&path, buf, ctx)?;
                self.dependencies.push(bundle);
                if !job.open_next()? {
                    return Err(LoadError::resolution(&self.key, "main bundle missing from plan"));
                }
                self.stream = Some(job);
            }
            ReadRole::MainBundle => {
                let bundle = self.bundle_from_bytes(&path, buf, ctx)?;
                let name = job.asset_name.as_deref().unwrap_or_else(|| self.key.location().name());
                let payload = self.extract(&bundle, name, &path)?;
                self.succeed(payload, Some(bundle));
            }
        }
        Ok(())
    }

    fn open_bundle(&self, path: &Path, ctx: &LoadContext<'_>) -> Result<Bundle, LoadError> {
        match ctx.decrypt {
            Some(_) => {
                let raw = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
                self.bundle_from_bytes(path, raw, ctx)
            }
            None => Bundle::open(path).map_err(|e| LoadError::from_bundle(&self.key, path, e)),
        }
    }

    fn bundle_from_bytes(
        &self,
        path: &Path,
        raw: Vec<u8>,
        ctx: &LoadContext<'_>,
    ) -> Result<Bundle, LoadError> {
        let bytes = match ctx.decrypt {
            Some(decrypt) => decrypt.decrypt(raw).map_err(|e| LoadError::Decrypt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            None => raw,
        };
        Bundle::from_bytes(bytes).map_err(|e| LoadError::from_bundle(&self.key, path, e))
    }

    fn extract(&self, bundle: &Bundle, name: &str, path: &Path) -> Result<Payload, LoadError> {
        let entry = bundle.entry(name).ok_or_else(|| {
            LoadError::resolution(
                &self.key,
                format!("bundle {} has no entry '{}'", path.display(), name),
            )
        })?;
        if !self.decoder.accepts(&entry.type_name) {
            return Err(LoadError::type_mismatch(
                &self.key,
                self.decoder.type_name(),
                &entry.type_name,
            ));
        }
        let bytes = bundle
            .read_entry(name)
            .map_err(|e| LoadError::from_bundle(&self.key, path, e))?;
        self.decode(&bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload, LoadError> {
        self.decoder.decode(bytes).map_err(|reason| {
            LoadError::type_mismatch(
                &self.key,
                self.decoder.type_name(),
                &format!("undecodable payload ({})", reason),
            )
        })
    }

    fn succeed(&mut self, payload: Payload, bundle: Option<Bundle>) {
        self.state = LoaderState::Succeeded;
        self.payload = Some(payload);
        self.bundle = bundle;
        self.stream = None;
        self.error = None;
        tracing::debug!(key = %self.key, bundles = self.open_bundle_count(), "load succeeded");
    }

    /// Terminal failure: every open file and bundle handle is dropped here,
    /// independent of the reference count.
    pub(crate) fn fail(&mut self, err: LoadError) {
        tracing::warn!(
            location = %self.key.location(),
            variant = self.key.variant().unwrap_or(""),
            error = %err,
            "asset load failed"
        );
        self.state = LoaderState::Failed;
        self.payload = None;
        self.bundle = None;
        self.dependencies.clear();
        self.stream = None;
        self.error = Some(err);
    }
}
