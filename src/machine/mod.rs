use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::instr::Instr;

/// Runtime value for the reference machine. Arrays and hashes are shared
/// references: a stored value and its stack copy alias the same storage,
/// which is what the binder's store-then-re-read rest handling relies on.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Hash(Rc<RefCell<HashMap<String, Value>>>),
    /// A plain attribute bag; writer sends (`name=`) set fields on it.
    Object(Rc<RefCell<HashMap<String, Value>>>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn hash<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Value {
        Value::Hash(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn object() -> Value {
        Value::Object(Rc::new(RefCell::new(HashMap::new())))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Build a value from CLI-supplied JSON: objects become hashes,
    /// integral numbers become ints.
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::hash(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v))),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Hash(a), Value::Hash(b)) => *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => write_entries(f, "{", &entries.borrow(), "}"),
            Value::Object(fields) => write_entries(f, "#<object ", &fields.borrow(), ">"),
        }
    }
}

fn write_entries(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    entries: &HashMap<String, Value>,
    close: &str,
) -> fmt::Result {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    write!(f, "{open}")?;
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{key}: {}", entries[key.as_str()])?;
    }
    write!(f, "{close}")
}

#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("expected an array on top of the stack")]
    ExpectedArray,
    #[error("expected a hash on top of the stack")]
    ExpectedHash,
    #[error("expected an argument count on top of the stack")]
    ExpectedArgc,
    #[error("missing keyword: {name}")]
    MissingKeyword { name: String },
    #[error("unknown keywords: {keys}")]
    UnknownKeywords { keys: String },
    #[error("undefined local variable: {name}")]
    UndefinedVariable { name: String },
    #[error("undefined method '{name}' for {receiver}")]
    UndefinedMethod { name: String, receiver: String },
    #[error("index for []= must be an integer")]
    BadIndex,
    #[error("unmatched branch marker")]
    UnmatchedBranch,
}

impl MachineError {
    /// Stable diagnostic code for the runtime failures the binding pass
    /// encodes deliberately (see `diagnostic::registry`).
    pub fn code(&self) -> Option<&'static str> {
        match self {
            MachineError::UnknownKeywords { .. } => Some("BRL-R001"),
            MachineError::MissingKeyword { .. } => Some("BRL-R002"),
            _ => None,
        }
    }
}

type Result<T> = std::result::Result<T, MachineError>;

/// Reference executor for binding sequences. One flat scope; `local_only`
/// on stores is metadata for the full VM's scope resolution and has no
/// effect here.
#[derive(Debug)]
pub struct Machine {
    stack: Vec<Value>,
    pub locals: HashMap<String, Value>,
    pub ivars: HashMap<String, Value>,
    pub cvars: HashMap<String, Value>,
    pub globals: HashMap<String, Value>,
    pub consts: HashMap<String, Value>,
    pub self_value: Value,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            stack: Vec::new(),
            locals: HashMap::new(),
            ivars: HashMap::new(),
            cvars: HashMap::new(),
            globals: HashMap::new(),
            consts: HashMap::new(),
            self_value: Value::object(),
        }
    }

    /// Run a binding sequence the way a method prologue would: the
    /// keyword hash (when the caller extracted one) sits beneath the
    /// positional-argument array.
    pub fn bind(
        instrs: &[Instr],
        positional: Vec<Value>,
        keywords: Option<Vec<(String, Value)>>,
    ) -> Result<Machine> {
        let mut machine = Machine::new();
        if let Some(kw) = keywords {
            machine.push(Value::hash(kw));
        }
        machine.push(Value::array(positional));
        machine.run(instrs)?;
        Ok(machine)
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(MachineError::StackUnderflow)
    }

    fn top_array(&self) -> Result<Rc<RefCell<Vec<Value>>>> {
        match self.stack.last() {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(MachineError::ExpectedArray),
        }
    }

    fn top_hash(&self) -> Result<Rc<RefCell<HashMap<String, Value>>>> {
        match self.stack.last() {
            Some(Value::Hash(entries)) => Ok(entries.clone()),
            _ => Err(MachineError::ExpectedHash),
        }
    }

    pub fn run(&mut self, instrs: &[Instr]) -> Result<()> {
        let mut pc = 0;
        while pc < instrs.len() {
            match &instrs[pc] {
                Instr::PushNil => self.push(Value::Nil),
                Instr::PushBool(b) => self.push(Value::Bool(*b)),
                Instr::PushInt(i) => self.push(Value::Int(*i)),
                Instr::PushFloat(x) => self.push(Value::Float(*x)),
                Instr::PushStr(s) => self.push(Value::Str(s.clone())),
                Instr::PushSelf => self.push(self.self_value.clone()),
                Instr::PushArgc(n) => self.push(Value::Int(*n as i64)),
                Instr::Pop => {
                    self.pop()?;
                }
                Instr::Dup => {
                    let top = self.stack.last().ok_or(MachineError::StackUnderflow)?;
                    self.push(top.clone());
                }
                Instr::Swap => {
                    let len = self.stack.len();
                    if len < 2 {
                        return Err(MachineError::StackUnderflow);
                    }
                    self.stack.swap(len - 1, len - 2);
                }
                Instr::ArrayShift => {
                    let items = self.top_array()?;
                    let value = {
                        let mut items = items.borrow_mut();
                        if items.is_empty() { Value::Nil } else { items.remove(0) }
                    };
                    self.push(value);
                }
                Instr::ArrayPop => {
                    let items = self.top_array()?;
                    let value = items.borrow_mut().pop().unwrap_or(Value::Nil);
                    self.push(value);
                }
                Instr::ArrayShiftWithDefault => {
                    let default = self.pop()?;
                    let items = self.top_array()?;
                    let value = {
                        let mut items = items.borrow_mut();
                        if items.is_empty() { default } else { items.remove(0) }
                    };
                    self.push(value);
                }
                Instr::ArrayPopWithDefault => {
                    let default = self.pop()?;
                    let items = self.top_array()?;
                    let value = items.borrow_mut().pop().unwrap_or(default);
                    self.push(value);
                }
                Instr::ToArray => {
                    let value = self.pop()?;
                    let coerced = match value {
                        Value::Array(items) => items.borrow().clone(),
                        Value::Nil => Vec::new(),
                        other => vec![other],
                    };
                    self.push(Value::array(coerced));
                }
                Instr::ArrayNew(n) => {
                    if self.stack.len() < *n {
                        return Err(MachineError::StackUnderflow);
                    }
                    let items = self.stack.split_off(self.stack.len() - n);
                    self.push(Value::array(items));
                }
                Instr::VariableSet { name, .. } => {
                    let value = self.pop()?;
                    self.locals.insert(name.clone(), value);
                }
                Instr::VariableGet { name } => {
                    let value = self
                        .locals
                        .get(name)
                        .cloned()
                        .ok_or_else(|| MachineError::UndefinedVariable { name: name.clone() })?;
                    self.push(value);
                }
                Instr::InstanceVariableSet { name } => {
                    let value = self.pop()?;
                    self.ivars.insert(name.clone(), value);
                }
                Instr::ClassVariableSet { name } => {
                    let value = self.pop()?;
                    self.cvars.insert(name.clone(), value);
                }
                Instr::GlobalVariableSet { name } => {
                    let value = self.pop()?;
                    self.globals.insert(name.clone(), value);
                }
                Instr::ConstSet { name } => {
                    // Namespace first (pushed as self); one flat constant
                    // table here.
                    self.pop()?;
                    let value = self.pop()?;
                    self.consts.insert(name.clone(), value);
                }
                Instr::HashDelete { name } => {
                    let entries = self.top_hash()?;
                    let value = entries
                        .borrow_mut()
                        .remove(name)
                        .ok_or_else(|| MachineError::MissingKeyword { name: name.clone() })?;
                    self.push(value);
                }
                Instr::HashDeleteWithDefault { name } => {
                    let default = self.pop()?;
                    let entries = self.top_hash()?;
                    let value = entries.borrow_mut().remove(name).unwrap_or(default);
                    self.push(value);
                }
                Instr::CheckExtraKeywords => {
                    let entries = self.top_hash()?;
                    let entries = entries.borrow();
                    if !entries.is_empty() {
                        let mut keys: Vec<&str> =
                            entries.keys().map(String::as_str).collect();
                        keys.sort_unstable();
                        return Err(MachineError::UnknownKeywords { keys: keys.join(", ") });
                    }
                }
                Instr::IsNil => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_nil()));
                }
                Instr::If => {
                    let (else_idx, end_idx) = find_branch(instrs, pc)?;
                    let condition = self.pop()?;
                    if condition.truthy() {
                        pc += 1;
                    } else {
                        pc = else_idx.map(|i| i + 1).unwrap_or(end_idx);
                    }
                    continue;
                }
                Instr::Else => {
                    // Fell through the then-branch: skip to the matching end.
                    pc = matching_end(instrs, pc)?;
                    continue;
                }
                Instr::EndIf => {}
                Instr::Send { name, .. } => {
                    let argc = match self.pop()? {
                        Value::Int(n) if n >= 0 => n as usize,
                        _ => return Err(MachineError::ExpectedArgc),
                    };
                    if self.stack.len() < argc + 1 {
                        return Err(MachineError::StackUnderflow);
                    }
                    let args = self.stack.split_off(self.stack.len() - argc);
                    let receiver = self.pop()?;
                    let result = dispatch(name, receiver, args)?;
                    self.push(result);
                }
            }
            pc += 1;
        }
        Ok(())
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer-method dispatch for the value kinds the binding pass can
/// target: `[]=` on arrays and hashes, `name=` attribute writes on
/// objects. Returns the assigned value, like the full runtime.
fn dispatch(name: &str, receiver: Value, mut args: Vec<Value>) -> Result<Value> {
    match (&receiver, name) {
        (Value::Array(items), "[]=") if args.len() == 2 => {
            let value = args.pop().ok_or(MachineError::StackUnderflow)?;
            let index = match args[0] {
                Value::Int(i) if i >= 0 => i as usize,
                _ => return Err(MachineError::BadIndex),
            };
            let mut items = items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Nil);
            }
            items[index] = value.clone();
            Ok(value)
        }
        (Value::Hash(entries), "[]=") if args.len() == 2 => {
            let value = args.pop().ok_or(MachineError::StackUnderflow)?;
            let key = match &args[0] {
                Value::Str(s) => s.clone(),
                other => other.to_string(),
            };
            entries.borrow_mut().insert(key, value.clone());
            Ok(value)
        }
        (Value::Object(fields), writer) if writer.ends_with('=') && args.len() == 1 => {
            let value = args.pop().ok_or(MachineError::StackUnderflow)?;
            let field = writer.trim_end_matches('=').to_string();
            fields.borrow_mut().insert(field, value.clone());
            Ok(value)
        }
        _ => Err(MachineError::UndefinedMethod {
            name: name.to_string(),
            receiver: receiver.to_string(),
        }),
    }
}

/// For an `If` at `from`, the matching `Else` (if any) and `EndIf`.
fn find_branch(instrs: &[Instr], from: usize) -> Result<(Option<usize>, usize)> {
    let mut depth = 0;
    let mut else_idx = None;
    for (i, instr) in instrs.iter().enumerate().skip(from + 1) {
        match instr {
            Instr::If => depth += 1,
            Instr::Else if depth == 0 => else_idx = Some(i),
            Instr::EndIf => {
                if depth == 0 {
                    return Ok((else_idx, i));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(MachineError::UnmatchedBranch)
}

/// For an `Else` at `from`, the matching `EndIf`.
fn matching_end(instrs: &[Instr], from: usize) -> Result<usize> {
    let mut depth = 0;
    for (i, instr) in instrs.iter().enumerate().skip(from + 1) {
        match instr {
            Instr::If => depth += 1,
            Instr::EndIf => {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(MachineError::UnmatchedBranch)
}
