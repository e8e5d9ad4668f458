//! Script session: the engine plus the state that survives between units of work.

use std::sync::{Arc, Mutex, MutexGuard};

use rhai::{module_resolvers::DummyModuleResolver, Engine, Scope, AST};

use super::ExecutionResult;
use crate::{config::Config, error::ConfigError};

/// Engine resource caps. Zero means unlimited, except for call depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
            max_string_size: 0,
            max_array_size: 0,
            max_map_size: 0,
        }
    }
}

impl Limits {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let d = Self::default();
        let size = |key: &str, default: usize| -> Result<usize, ConfigError> {
            Ok(cfg.get_u64(key)?.map(|v| v as usize).unwrap_or(default))
        };
        Ok(Self {
            max_operations: cfg.get_u64("MAX_OPERATIONS")?.unwrap_or(d.max_operations),
            max_call_levels: size("MAX_CALL_LEVELS", d.max_call_levels)?,
            max_string_size: size("MAX_STRING_SIZE", d.max_string_size)?,
            max_array_size: size("MAX_ARRAY_SIZE", d.max_array_size)?,
            max_map_size: size("MAX_MAP_SIZE", d.max_map_size)?,
        })
    }
}

/// Capture buffers. `None` while no unit of work is running.
type Sink = Arc<Mutex<Option<ExecutionResult>>>;

fn lock(sink: &Sink) -> MutexGuard<'_, Option<ExecutionResult>> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Routes `print`/`debug` into fresh buffers until dropped.
struct Capture<'a> {
    sink: &'a Sink,
}

impl<'a> Capture<'a> {
    fn install(sink: &'a Sink) -> Self {
        *lock(sink) = Some(ExecutionResult::default());
        Self { sink }
    }

    fn error(&self, message: &str) {
        if let Some(buf) = lock(self.sink).as_mut() {
            buf.stderr.push_str("Execution Error: ");
            buf.stderr.push_str(message);
            buf.stderr.push('\n');
        }
    }

    fn finish(self) -> ExecutionResult {
        lock(self.sink).take().unwrap_or_default()
    }
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        lock(self.sink).take();
    }
}

/// Persistent execution state for one executor lifetime.
///
/// Top-level `let` bindings stay in the scope and top-level `fn` definitions
/// stay in the function library, so every later unit of work sees them.
pub struct Session {
    engine: Engine,
    scope: Scope<'static>,
    library: AST,
    sink: Sink,
}

impl Session {
    pub fn new(limits: Limits) -> Self {
        let sink: Sink = Arc::new(Mutex::new(None));
        let mut engine = Engine::new();

        // `import` must not reach the host filesystem.
        engine.set_module_resolver(DummyModuleResolver::new());
        engine
            .set_max_operations(limits.max_operations)
            .set_max_call_levels(limits.max_call_levels)
            .set_max_string_size(limits.max_string_size)
            .set_max_array_size(limits.max_array_size)
            .set_max_map_size(limits.max_map_size);

        let out = Arc::clone(&sink);
        engine.on_print(move |text| match lock(&out).as_mut() {
            Some(buf) => {
                buf.stdout.push_str(text);
                buf.stdout.push('\n');
            }
            None => tracing::debug!(text, "print outside of a unit of work"),
        });

        let err = Arc::clone(&sink);
        engine.on_debug(move |text, _source, _pos| match lock(&err).as_mut() {
            Some(buf) => {
                buf.stderr.push_str(text);
                buf.stderr.push('\n');
            }
            None => tracing::debug!(text, "debug outside of a unit of work"),
        });

        Self { engine, scope: Scope::new(), library: AST::empty(), sink }
    }

    /// Run one unit of work. Failures are reported in `stderr`, never returned.
    pub fn execute(&mut self, code: &str) -> ExecutionResult {
        let sink = Arc::clone(&self.sink);
        let capture = Capture::install(&sink);
        if let Err(message) = self.run(code) {
            capture.error(&message);
        }
        capture.finish()
    }

    fn run(&mut self, code: &str) -> Result<(), String> {
        let ast = self.engine.compile(code).map_err(|e| e.to_string())?;
        let unit = self.library.merge(&ast);
        self.library = unit.clone_functions_only();
        self.engine
            .run_ast_with_scope(&mut self.scope, &unit)
            .map_err(|e| e.to_string())
    }

    /// Number of variables defined so far.
    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.scope.get_value::<T>(name)
    }

    #[cfg(test)]
    fn capturing(&self) -> bool {
        lock(&self.sink).is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}
