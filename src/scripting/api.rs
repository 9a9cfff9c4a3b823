/// `scripting/api.rs` — native globals registered into the script VM
///
/// Currently only `print`: it stringifies every argument with the VM's own
/// `tostring`, joins them with tabs and forwards the line to the callback
/// stored in the VM's app data. The callback lives and dies with the VM, so
/// the hook never reaches outside the engine that owns it.

use mlua::{Function, Lua, Result as LuaResult, Value, Variadic};

pub type PrintCallback = Box<dyn FnMut(String) + Send>;

/// App-data slot holding the optional print callback.
#[derive(Default)]
pub struct PrintHook(Option<PrintCallback>);

/// Install the `print` replacement on `lua` with no callback registered.
pub fn register_print(lua: &Lua) -> LuaResult<()> {
    lua.set_app_data(PrintHook::default());

    let print = lua.create_function(|lua, args: Variadic<Value>| {
        let registered = lua
            .app_data_ref::<PrintHook>()
            .map(|hook| hook.0.is_some())
            .unwrap_or(false);
        if !registered {
            return Ok(());
        }

        let tostring: Function = lua.globals().get("tostring")?;
        let mut line = String::new();
        for (i, arg) in args.iter().enumerate() {
            let converted: Value = tostring.call(arg.clone())?;
            let Value::String(s) = converted else {
                return Err(mlua::Error::runtime("'tostring' must return a string to 'print'"));
            };
            if i > 0 {
                line.push('\t');
            }
            line.push_str(&s.to_string_lossy());
        }

        if let Some(mut hook) = lua.app_data_mut::<PrintHook>() {
            if let Some(callback) = hook.0.as_mut() {
                callback(line);
            }
        }
        Ok(())
    })?;

    lua.globals().set("print", print)
}

pub fn set_print_callback(lua: &Lua, callback: Option<PrintCallback>) {
    lua.set_app_data(PrintHook(callback));
}

pub fn remove_print_hook(lua: &Lua) {
    lua.remove_app_data::<PrintHook>();
}
