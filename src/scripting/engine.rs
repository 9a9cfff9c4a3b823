/// `scripting/engine.rs` — single-instance Lua VM wrapper
///
/// `ScriptEngine` owns one Lua VM for its whole lifetime and at most one
/// compiled chunk. Every `compile()` throws the previous chunk away first,
/// so a failed compile leaves nothing to run.
///
/// The engine is driven from the audio thread only; the control thread talks
/// to it through the compile-request slot in `audio::engine::EngineShared`.

use std::path::Path;

use mlua::{Function, Lua, Table, Value};

use super::api::{self, PrintCallback};

pub const NO_INSTANCE_ERROR: &str = "No compiled instance to run";

/// Chunk name shown in script error messages (`script:1: ...`).
const CHUNK_NAME: &str = "=script";

pub struct ScriptEngine {
    // Declared before `lua` so the compiled chunk is released first.
    instance: Option<Function>,
    original_package_path: String,
    lua: Lua,
}

impl ScriptEngine {
    pub fn new() -> Result<Self, String> {
        let lua = Lua::new();

        let original_package_path = lua
            .globals()
            .get::<Table>("package")
            .and_then(|package| package.get::<String>("path"))
            .map_err(|e| format!("Failed to read package.path: {e}"))?;

        api::register_print(&lua).map_err(|e| format!("Failed to hook print: {e}"))?;

        Ok(Self {
            instance: None,
            original_package_path,
            lua,
        })
    }

    /// Add `dir` to the module search path, on top of the VM's default path.
    pub fn set_package_path(&self, dir: &str) -> Result<(), String> {
        let path = Path::new(dir);
        if !path.is_dir() {
            return Err(format!("Path not valid: {dir}"));
        }

        let search_path = format!(
            "{};{}",
            self.original_package_path,
            path.join("?.lua").display()
        );

        let package: Table = self
            .lua
            .globals()
            .get("package")
            .map_err(|e| format!("Failed to read package table: {e}"))?;
        package
            .set("path", search_path)
            .map_err(|e| format!("Failed to set package.path: {e}"))?;

        log::debug!("Lua package path extended with {dir}");
        Ok(())
    }

    /// Compile `source` into the engine's single runnable instance.
    pub fn compile(&mut self, source: &str) -> Result<(), String> {
        self.instance = None;

        let function = self
            .lua
            .load(source)
            .set_name(CHUNK_NAME)
            .into_function()
            .map_err(|e| error_message(&e))?;

        self.instance = Some(function);
        Ok(())
    }

    /// Call the compiled instance once.
    ///
    /// A return value the VM cannot convert to a number yields `0.0`, not an
    /// error.
    pub fn run_instance(&self) -> Result<f64, String> {
        let Some(function) = &self.instance else {
            return Err(NO_INSTANCE_ERROR.to_string());
        };

        let value: Value = function.call(()).map_err(|e| error_message(&e))?;
        Ok(self.lua.coerce_number(value).ok().flatten().unwrap_or(0.0))
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// Route `print(...)` output to `callback`.
    pub fn set_print_callback(&self, callback: impl FnMut(String) + Send + 'static) {
        let callback: PrintCallback = Box::new(callback);
        api::set_print_callback(&self.lua, Some(callback));
    }

    /// Make `print(...)` a no-op again.
    pub fn clear_print_callback(&self) {
        api::set_print_callback(&self.lua, None);
    }
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        self.instance = None;
        api::remove_print_hook(&self.lua);
    }
}

/// Appended by mlua's message handler to every runtime error.
const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Lua's own error text, without the binding layer's wrapping.
pub(crate) fn error_message(err: &mlua::Error) -> String {
    match err {
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(message) => strip_traceback(message).to_string(),
        mlua::Error::CallbackError { cause, .. } => error_message(cause),
        other => strip_traceback(&other.to_string()).to_string(),
    }
}

fn strip_traceback(message: &str) -> &str {
    message
        .find(TRACEBACK_MARKER)
        .map_or(message, |end| &message[..end])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::output_log::{LogKind, LogMessage, OutputLog, OUTPUT_LOG_MAX_MESSAGES};
    use std::sync::{Arc, Mutex};

    fn engine() -> ScriptEngine {
        ScriptEngine::new().expect("Lua VM should start")
    }

    #[test]
    fn compile_success() {
        let mut lua = engine();
        assert_eq!(lua.compile("return 42"), Ok(()));
        assert_eq!(lua.compile("function a() print('Hello World') end return 1"), Ok(()));
        assert_eq!(lua.compile("function a(b) return b * 2 end return a(4)"), Ok(()));
        assert!(lua.has_instance());
    }

    #[test]
    fn compile_error_drops_instance() {
        let mut lua = engine();
        assert_eq!(lua.compile("print('Hello World!')"), Ok(()));
        assert!(lua.has_instance());

        let err = lua.compile("ret 42").unwrap_err();
        assert!(!err.is_empty());
        assert!(!lua.has_instance(), "failed compile must leave no instance");

        assert!(lua.compile("function a() print('Hello World') end return 1 +").is_err());
        assert!(!lua.has_instance());

        assert_eq!(lua.compile("return 1"), Ok(()));
        assert!(lua.has_instance());
    }

    #[test]
    fn compile_error_carries_lua_message() {
        let mut lua = engine();
        let err = lua.compile("return +").unwrap_err();
        assert!(err.starts_with("script:1:"), "unexpected message: {err}");
    }

    #[test]
    fn run_without_compile() {
        let lua = engine();
        assert_eq!(lua.run_instance(), Err(NO_INSTANCE_ERROR.to_string()));
    }

    #[test]
    fn run_compiled_instances() {
        let mut lua = engine();

        lua.compile("return 42").unwrap();
        assert_eq!(lua.run_instance(), Ok(42.0));

        lua.compile("return 'hello world'").unwrap();
        assert_eq!(lua.run_instance(), Ok(0.0), "non-numbers return 0.0");

        lua.compile("return 0.314").unwrap();
        assert_eq!(lua.run_instance(), Ok(0.314));

        lua.compile("function a(b) return b * 2 end return a(4)").unwrap();
        assert_eq!(lua.run_instance(), Ok(8.0));

        lua.compile("return '0.5'").unwrap();
        assert_eq!(lua.run_instance(), Ok(0.5), "numeric strings coerce like Lua does");
    }

    #[test]
    fn runtime_error_is_reported() {
        let mut lua = engine();
        lua.compile("return nil + 1").unwrap();
        let err = lua.run_instance().unwrap_err();
        assert!(err.contains("attempt to perform arithmetic"), "unexpected message: {err}");
        // The instance survives a runtime error.
        assert!(lua.has_instance());
    }

    #[test]
    fn instance_keeps_state_between_runs() {
        let mut lua = engine();
        lua.compile("n = (n or 0) + 1 return n").unwrap();
        assert_eq!(lua.run_instance(), Ok(1.0));
        assert_eq!(lua.run_instance(), Ok(2.0));
    }

    #[test]
    fn set_package_path_error() {
        let lua = engine();
        assert!(lua.set_package_path("nonexistent/path").is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        let err = lua.set_package_path(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.starts_with("Path not valid: "));
    }

    #[test]
    fn set_package_path_enables_require() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("helper.lua"), "return { value = 0.25 }").unwrap();

        let mut lua = engine();
        assert_eq!(lua.set_package_path(dir.path().to_str().unwrap()), Ok(()));
        lua.compile("return require('helper').value").unwrap();
        assert_eq!(lua.run_instance(), Ok(0.25));

        let search_path: String = lua
            .lua
            .globals()
            .get::<Table>("package")
            .and_then(|package| package.get("path"))
            .unwrap();
        assert!(
            search_path.starts_with(&format!("{};", lua.original_package_path)),
            "default search path must be kept: {search_path}"
        );
        assert!(search_path.ends_with("?.lua"));
    }

    #[test]
    fn runtime_errors_have_no_traceback() {
        let mut lua = engine();

        lua.compile("error('even')").unwrap();
        assert_eq!(lua.run_instance(), Err("script:1: even".to_string()));

        lua.compile("return nil + 1").unwrap();
        let err = lua.run_instance().unwrap_err();
        assert!(!err.contains("stack traceback"), "unexpected message: {err}");
        assert!(err.starts_with("script:1: attempt to perform arithmetic"));

        lua.set_print_callback(|_| {});
        lua.compile("print(setmetatable({}, { __tostring = function() error('bad value') end }))")
            .unwrap();
        let err = lua.run_instance().unwrap_err();
        assert!(!err.contains("stack traceback"), "unexpected message: {err}");
        assert!(err.contains("bad value"), "unexpected message: {err}");
    }

    #[test]
    fn strip_traceback_keeps_plain_messages() {
        assert_eq!(strip_traceback("script:1: x"), "script:1: x");
        assert_eq!(strip_traceback("script:1: x\nstack traceback:\n\t[C]: in ?"), "script:1: x");
    }

    #[test]
    fn print_callback() {
        let mut lua = engine();
        let result = Arc::new(Mutex::new(String::from("deadbeef")));

        lua.compile("print('Hello World!')").unwrap();
        assert_eq!(lua.run_instance(), Ok(0.0), "print without callback is a no-op");
        assert_eq!(*result.lock().unwrap(), "deadbeef");

        let sink = Arc::clone(&result);
        lua.set_print_callback(move |s| *sink.lock().unwrap() = s);

        lua.run_instance().unwrap();
        assert_eq!(*result.lock().unwrap(), "Hello World!", "callback fires without recompiling");

        lua.compile("print(3+2, 'asdf')").unwrap();
        lua.run_instance().unwrap();
        assert_eq!(*result.lock().unwrap(), "5\tasdf");

        lua.clear_print_callback();
        lua.compile("print('ignored')").unwrap();
        lua.run_instance().unwrap();
        assert_eq!(*result.lock().unwrap(), "5\tasdf");
    }

    #[test]
    fn print_with_bad_tostring_raises() {
        let mut lua = engine();
        lua.set_print_callback(|_| {});
        lua.compile("tostring = function() return {} end print(1)").unwrap();
        let err = lua.run_instance().unwrap_err();
        assert!(err.contains("'tostring' must return a string"), "unexpected message: {err}");
    }

    #[test]
    fn engines_are_isolated() {
        let mut a = engine();
        let mut b = engine();
        a.compile("shared = 1 return shared").unwrap();
        b.compile("return shared").unwrap();
        assert_eq!(a.run_instance(), Ok(1.0));
        assert_eq!(b.run_instance(), Ok(0.0), "globals must not leak between engines");
    }

    #[test]
    fn output_log() {
        let mut lua = engine();
        let log = Arc::new(Mutex::new(OutputLog::new()));
        let sink = Arc::clone(&log);
        lua.set_print_callback(move |s| {
            sink.lock().unwrap().add(LogMessage { text: s, kind: LogKind::Text })
        });

        lua.compile("print(3+2, 'asdf')").unwrap();
        lua.run_instance().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.front().unwrap().text, "5\tasdf");
        assert_eq!(log.front().unwrap().kind, LogKind::Text);
    }

    #[test]
    fn output_log_overflow() {
        let mut lua = engine();
        let log = Arc::new(Mutex::new(OutputLog::new()));
        let sink = Arc::clone(&log);
        lua.set_print_callback(move |s| {
            sink.lock().unwrap().add(LogMessage { text: s, kind: LogKind::Text })
        });

        lua.compile("print('foo')").unwrap();
        lua.run_instance().unwrap();
        for _ in 0..500 {
            lua.compile("print('Hello World!')").unwrap();
            lua.run_instance().unwrap();
        }
        lua.compile("print('bar')").unwrap();
        lua.run_instance().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), OUTPUT_LOG_MAX_MESSAGES);
        assert_eq!(log.front().unwrap().text, "Hello World!");
        assert_eq!(log.back().unwrap().text, "bar");
    }
}
