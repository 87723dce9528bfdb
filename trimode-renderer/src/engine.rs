//! Backend orchestration: capability-driven selection, bounded fallback and
//! dispose-then-create switching.

use serde::{Deserialize, Serialize};
use trimode_core::{Mode, OptionName, Translation};

use crate::{
    backend::{Backend, RenderBackend},
    capability::{Capabilities, CapabilityProber},
    EngineConfig, EngineError, EngineResult, Host, RenderError,
};

/// Maximum number of fallback steps in one `init_engine` call.
///
/// `accelerated → rasterized → software` is two steps.
pub const MAX_FALLBACK_HOPS: usize = 2;

/// Snapshot of engine state for host display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    /// Mode being rendered, after any fallback.
    pub mode: Mode,
    /// Whether a backend is live.
    pub active: bool,
    /// Whether the live backend's frame loop runs.
    pub running: bool,
    /// Accelerated path unsupported, a fallback is in use.
    pub fallback_active: bool,
    /// Frames drawn by the live backend.
    pub frames_rendered: u64,
}

/// Owns the active backend and switches between modes.
pub struct Engine<H: Host> {
    host: H,
    config: EngineConfig,
    capabilities: Capabilities,
    selected: Mode,
    mode: Mode,
    active: Option<Backend>,
    fallback_active: bool,
}

impl<H: Host> Engine<H> {
    /// Probe `host` and pick the starting mode. No backend is built yet.
    pub fn new(host: H, config: EngineConfig) -> Self {
        let capabilities = CapabilityProber::probe(&host);
        let mode = capabilities.starting_mode(config.initial_mode);
        if mode != config.initial_mode {
            tracing::warn!("{} unsupported, starting in {mode} mode", config.initial_mode);
        }
        let fallback_active = !capabilities.accelerated;

        Self {
            host,
            config,
            capabilities,
            selected: config.initial_mode,
            mode,
            active: None,
            fallback_active,
        }
    }

    /// Dispose the active backend and build one for the selected mode.
    ///
    /// An unsupported accelerated selection is built as rasterized without
    /// attempting it. A mode whose context is unavailable falls back one
    /// step, on a fresh surface, at most [`MAX_FALLBACK_HOPS`] times.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Exhausted`] if every mode on the chain is
    /// unavailable, and [`EngineError::Render`] if backend resources could not
    /// be built (no fallback in that case).
    pub async fn init_engine(&mut self) -> EngineResult<Mode> {
        self.dispose_active();

        self.mode = self.capabilities.starting_mode(self.selected);
        if self.mode != self.selected {
            tracing::debug!("{} unsupported, building {}", self.selected, self.mode);
            self.fallback_active = true;
        }

        let mut surface = self.host.surface();
        let mut hops = 0;
        loop {
            let attempt = Backend::create(
                self.mode,
                std::rc::Rc::clone(&surface),
                self.config.options,
                self.config.clear_color,
            )
            .await;

            match attempt {
                Ok(mut backend) => {
                    backend.start();
                    if self.mode == Mode::Accelerated {
                        self.fallback_active = false;
                    }
                    tracing::info!("Rendering with {} backend", self.mode);
                    self.active = Some(backend);
                    return Ok(self.mode);
                }
                Err(RenderError::BackendUnavailable(reason)) => {
                    let next = self.mode.fallback().filter(|_| hops < MAX_FALLBACK_HOPS);
                    let Some(next) = next else {
                        tracing::error!("No backend available, last failure: {reason}");
                        return Err(EngineError::Exhausted {
                            attempts: hops + 1,
                            reason,
                        });
                    };

                    tracing::warn!("{} unavailable ({reason}), falling back to {next}", self.mode);
                    if self.mode == Mode::Accelerated {
                        self.fallback_active = true;
                    }
                    self.mode = next;
                    hops += 1;
                    surface = self.host.recreate_surface()?;
                }
                Err(e) => {
                    tracing::error!("{} backend failed to build resources: {e}", self.mode);
                    return Err(e.into());
                }
            }
        }
    }

    /// Advance the selection along the toggle cycle and rebuild on a fresh
    /// surface.
    ///
    /// The selection always follows the full cycle, so three toggles return
    /// to it. Returns the mode actually built, which differs from the
    /// selection when it fell back.
    ///
    /// # Errors
    ///
    /// See [`Engine::init_engine`].
    pub async fn toggle_mode(&mut self) -> EngineResult<Mode> {
        self.dispose_active();

        let next = self.selected.next();
        tracing::info!("Toggling {} -> {next}", self.selected);
        self.selected = next;

        self.host.recreate_surface()?;
        self.init_engine().await
    }

    /// Flip a backend option by name and rebuild on a fresh surface.
    ///
    /// Returns the option's new value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownOption`] for an unrecognized name, in
    /// which case the live backend is left untouched; otherwise see
    /// [`Engine::init_engine`].
    pub async fn toggle_option(&mut self, name: &str) -> EngineResult<bool> {
        let option: OptionName = name
            .parse()
            .map_err(|_| EngineError::UnknownOption(name.to_string()))?;

        self.dispose_active();
        let value = self.config.options.toggle(option);
        tracing::info!("Option {name} set to {value}");

        self.host.recreate_surface()?;
        self.init_engine().await?;
        Ok(value)
    }

    /// Drive one frame of the active backend. Returns whether it drew.
    pub fn frame(&mut self) -> bool {
        let Some(backend) = self.active.as_mut() else {
            return false;
        };
        match backend.frame() {
            Ok(drawn) => drawn,
            Err(e) => {
                tracing::warn!("{} frame failed: {e}", backend.backend_type());
                false
            }
        }
    }

    /// Pause the active backend's frame loop.
    pub fn stop(&mut self) {
        if let Some(backend) = self.active.as_mut() {
            backend.stop();
        }
    }

    /// Resume the active backend's frame loop.
    pub fn start(&mut self) {
        if let Some(backend) = self.active.as_mut() {
            backend.start();
        }
    }

    /// Dispose the active backend.
    pub fn shutdown(&mut self) {
        self.dispose_active();
    }

    fn dispose_active(&mut self) {
        if let Some(mut backend) = self.active.take() {
            let mode = backend.backend_type();
            backend.dispose();
            tracing::debug!("Disposed {mode} backend");
        }
    }

    /// Position on the toggle cycle.
    #[must_use]
    pub fn selected_mode(&self) -> Mode {
        self.selected
    }

    /// Mode of the backend built last, after any fallback.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the accelerated path is unsupported and a fallback is in use.
    #[must_use]
    pub fn fallback_active(&self) -> bool {
        self.fallback_active
    }

    /// Capabilities probed at startup.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Engine configuration, including the current option values.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live backend, if any.
    #[must_use]
    pub fn active_backend(&self) -> Option<&Backend> {
        self.active.as_ref()
    }

    /// Translation of the live backend.
    #[must_use]
    pub fn translation(&self) -> Option<Translation> {
        self.active.as_ref().map(|b| b.translation().get())
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            mode: self.mode,
            active: self.active.is_some(),
            running: self.active.as_ref().is_some_and(RenderBackend::is_running),
            fallback_active: self.fallback_active,
            frames_rendered: self
                .active
                .as_ref()
                .map_or(0, RenderBackend::frames_rendered),
        }
    }
}

impl<H: Host> Drop for Engine<H> {
    fn drop(&mut self) {
        self.dispose_active();
    }
}
