//! Module (component B): the top-level container for a compiled program.

use std::sync::Mutex;

use crate::common::{id, Id, Map};
use crate::types::DataType;

use super::value::ConstValue;
use super::{Function, ModuleId, Param, MODULE_ID_BASE};

/// Names the runtime and the emitter reserve: `main` is the program entry
/// point the driver synthesizes around the user's declared functions, and
/// `printf`/`atoi`/`atof` are libc symbols the emitter calls directly
/// (§4.D, §4.I). A user declaration with one of these names would silently
/// collide with codegen, so `create_function`/`create_global_*` refuse it.
const RESERVED_NAMES: &[&str] = &["main", "printf", "atoi", "atof"];

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum GlobalData {
    Int(i64),
    Float(f64),
    /// A string literal's UTF-8 bytes, not yet NUL-appended; the emitter
    /// owns that detail (§4.I).
    Str(String),
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Global {
    pub id: ModuleId,
    pub name: Id,
    pub data: GlobalData,
}

impl Global {
    pub fn ty(&self) -> DataType {
        match self.data {
            GlobalData::Int(_) => DataType::Int,
            GlobalData::Float(_) => DataType::Float,
            GlobalData::Str(_) => DataType::String,
        }
    }
}

/// A compiled program: every function, global, and interned string/constant
/// it declares. Module-scoped ids are handed out from a single monotonic
/// counter offset by [`MODULE_ID_BASE`] (§3), guarded by a mutex so the
/// per-function worker pool (§5) can allocate ids concurrently while
/// lowering different functions.
#[derive(Debug, Default)]
pub struct Module {
    pub functions: Map<Id, Function>,
    pub globals: Map<Id, Global>,
    /// Deduplicated string pool: same text always gets the same id.
    strings: Map<String, ModuleId>,
    function_order: Vec<Id>,
    global_order: Vec<Id>,
    string_order: Vec<(ModuleId, String)>,
    function_by_id: Map<ModuleId, Id>,
    global_by_id: Map<ModuleId, Id>,
    next_id: Mutex<u32>,
}

impl Module {
    pub fn new() -> Self {
        Module {
            next_id: Mutex::new(MODULE_ID_BASE),
            ..Default::default()
        }
    }

    fn alloc_id(&self) -> ModuleId {
        let mut next = self.next_id.lock().expect("module id counter poisoned");
        let id = ModuleId(*next);
        *next += 1;
        id
    }

    fn check_name_free(&self, name: Id) {
        assert!(
            !RESERVED_NAMES.contains(&name.as_str()),
            "builder misuse: `{name}` is a reserved name and cannot be declared"
        );
        assert!(
            !self.functions.contains_key(&name) && !self.globals.contains_key(&name),
            "builder misuse: duplicate module-level declaration of `{name}`"
        );
    }

    pub fn create_function(&mut self, name: impl Into<String>, params: Vec<Param>, ret_ty: DataType) -> Id {
        let name = id(name);
        self.check_name_free(name);
        let fid = self.alloc_id();
        self.functions.insert(name, Function::new(fid, name, params, ret_ty));
        self.function_order.push(name);
        self.function_by_id.insert(fid, name);
        name
    }

    pub fn get_function(&self, name: Id) -> Option<&Function> {
        self.functions.get(&name)
    }

    pub fn get_function_mut(&mut self, name: Id) -> Option<&mut Function> {
        self.functions.get_mut(&name)
    }

    pub fn function_name_by_id(&self, id: ModuleId) -> Option<Id> {
        self.function_by_id.get(&id).copied()
    }

    pub fn get_function_by_id(&self, id: ModuleId) -> Option<&Function> {
        self.function_name_by_id(id).and_then(|name| self.get_function(name))
    }

    fn create_global(&mut self, name: impl Into<String>, data: GlobalData) -> ModuleId {
        let name = id(name);
        self.check_name_free(name);
        let gid = self.alloc_id();
        self.globals.insert(name, Global { id: gid, name, data });
        self.global_order.push(name);
        self.global_by_id.insert(gid, name);
        gid
    }

    pub fn global_name_by_id(&self, id: ModuleId) -> Option<Id> {
        self.global_by_id.get(&id).copied()
    }

    pub fn create_global_int(&mut self, name: impl Into<String>, value: i64) -> ModuleId {
        self.create_global(name, GlobalData::Int(value))
    }

    pub fn create_global_float(&mut self, name: impl Into<String>, value: f64) -> ModuleId {
        self.create_global(name, GlobalData::Float(value))
    }

    /// Register a string-literal occurrence, always minting a fresh id —
    /// unlike `intern_string`, two calls with identical text never share
    /// one (§3: literals are interned by the identity of the creating
    /// call site, not by value).
    pub fn create_global_string(&mut self, text: impl Into<String>) -> ModuleId {
        let sid = self.alloc_id();
        self.string_order.push((sid, text.into()));
        sid
    }

    pub fn get_global(&self, name: Id) -> Option<&Global> {
        self.globals.get(&name)
    }

    /// Intern text by value, assigning it a fresh id on first sight and
    /// reusing the existing one otherwise. Used for synthesized `print`
    /// format strings (§4.D), where identical argument-type shapes should
    /// share one data-segment entry; source string literals use
    /// [`Module::create_global_string`] instead, which never dedups.
    pub fn intern_string(&mut self, text: impl Into<String>) -> ModuleId {
        let text = text.into();
        if let Some(id) = self.strings.get(&text) {
            return *id;
        }
        let sid = self.alloc_id();
        self.strings.insert(text.clone(), sid);
        self.string_order.push((sid, text));
        sid
    }

    /// Mirror a block-local constant into the module's constant pool,
    /// returning its stable id for possible data-segment placement (§4.B).
    pub fn intern_constant(&mut self, value: ConstValue) -> ModuleId {
        let text = match value {
            ConstValue::Int(v) => format!("\0const.i.{v}"),
            ConstValue::Float(v) => format!("\0const.f.{v}"),
        };
        self.intern_string(text)
    }

    pub fn functions_in_order(&self) -> impl Iterator<Item = &Function> {
        self.function_order.iter().map(move |n| &self.functions[n])
    }

    pub fn globals_in_order(&self) -> impl Iterator<Item = &Global> {
        self.global_order.iter().map(move |n| &self.globals[n])
    }

    pub fn strings_in_order(&self) -> impl Iterator<Item = &(ModuleId, String)> {
        self.string_order.iter()
    }

    /// The id a constant was interned under, without allocating a new one
    /// (§4.I needs this read-only at emission time; every constant referenced
    /// by a function's LIR was already interned by `lower`).
    pub fn constant_id(&self, value: ConstValue) -> Option<ModuleId> {
        self.strings.get(&Self::constant_marker(value)).copied()
    }

    fn constant_marker(value: ConstValue) -> String {
        match value {
            ConstValue::Int(v) => format!("\0const.i.{v}"),
            ConstValue::Float(v) => format!("\0const.f.{v}"),
        }
    }

    /// The true string-literal pool, in first-seen order: constant-pool
    /// markers (which share the same intern table) are filtered out.
    pub fn string_literals_in_order(&self) -> impl Iterator<Item = (ModuleId, &str)> {
        self.string_order.iter().filter_map(|(id, text)| if text.starts_with('\0') { None } else { Some((*id, text.as_str())) })
    }

    /// The constant pool, in first-seen order, decoded back from its
    /// marker text (§4.B's `intern_constant` folds constants into the
    /// string table so a single lock protects both).
    pub fn constants_in_order(&self) -> impl Iterator<Item = (ModuleId, ConstValue)> + '_ {
        self.string_order.iter().filter_map(|(id, text)| Self::decode_constant_marker(text).map(|v| (*id, v)))
    }

    fn decode_constant_marker(text: &str) -> Option<ConstValue> {
        if let Some(rest) = text.strip_prefix("\0const.i.") {
            rest.parse::<i64>().ok().map(ConstValue::Int)
        } else if let Some(rest) = text.strip_prefix("\0const.f.") {
            rest.parse::<f64>().ok().map(ConstValue::Float)
        } else {
            None
        }
    }
}
