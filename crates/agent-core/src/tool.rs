//! Tool System
//!
//! Tools are registered at runtime under a unique name with a declared
//! parameter schema, and invoked by name by the tool executor. Every tool is
//! `(arguments) -> string` from the loop's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool invocation request emitted by the reasoner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, Value>,

    /// Invocation id, unique within a conversation
    #[serde(default)]
    pub id: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            id: String::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// String argument, if present and a string
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Id of the invocation this answers
    pub id: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: false,
            output: error.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    /// Required string parameter
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::typed(name, "string", description)
    }

    /// Required parameter of an arbitrary JSON type
    pub fn typed(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            enum_values: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn one_of(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.enum_values = Some(values.into_iter().collect());
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        match self.param_type.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParameterSchema) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema object describing the parameters
    pub fn parameters_json(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                let mut prop = serde_json::json!({
                    "type": p.param_type,
                    "description": p.description,
                });
                if let Some(values) = &p.enum_values {
                    prop["enum"] = Value::Array(values.clone());
                }
                (p.name.clone(), prop)
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check a call's arguments against this schema
    pub fn validate(&self, call: &ToolCall) -> Result<()> {
        for param in &self.parameters {
            let present = call.arguments.get(&param.name).filter(|v| !v.is_null());
            if param.required && present.is_none() {
                return Err(AgentError::invalid_arguments(
                    &self.name,
                    format!("missing required parameter '{}'", param.name),
                ));
            }
        }

        for (key, value) in &call.arguments {
            let Some(param) = self.parameters.iter().find(|p| &p.name == key) else {
                return Err(AgentError::invalid_arguments(
                    &self.name,
                    format!("unexpected parameter '{key}'"),
                ));
            };
            if value.is_null() && !param.required {
                continue;
            }
            if !param.accepts(value) {
                return Err(AgentError::invalid_arguments(
                    &self.name,
                    format!("parameter '{key}' must be of type {}", param.param_type),
                ));
            }
            if let Some(allowed) = &param.enum_values {
                if !allowed.contains(value) {
                    return Err(AgentError::invalid_arguments(
                        &self.name,
                        format!("parameter '{key}' must be one of {allowed:?}"),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> Result<()> {
        self.schema().validate(call)
    }
}

/// A tool backed by a plain function
pub struct FnTool<F> {
    schema: ToolSchema,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&ToolCall) -> Result<String> + Send + Sync,
{
    pub const fn new(schema: ToolSchema, func: F) -> Self {
        Self { schema, func }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&ToolCall) -> Result<String> + Send + Sync,
{
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let output = (self.func)(call)?;
        Ok(ToolResult::success(&self.schema.name, output))
    }
}

/// Registry for available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        tracing::debug!(tool = %schema.name, "Registered tool");
        self.tools.insert(schema.name, tool);
    }

    /// Register a plain function under the given schema
    pub fn register_fn<F>(&mut self, schema: ToolSchema, func: F)
    where
        F: Fn(&ToolCall) -> Result<String> + Send + Sync + 'static,
    {
        self.register(FnTool::new(schema, func));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call.
    ///
    /// Fails with `UnknownTool` for unregistered names and `InvalidArguments`
    /// when the arguments do not match the declared schema.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

        tool.validate(call)?;

        let mut result = tool.execute(call).await?;
        result.id.clone_from(&call.id);
        Ok(result)
    }

    /// Invoke a tool by name and return its output
    pub async fn invoke(&self, name: &str, arguments: HashMap<String, Value>) -> Result<String> {
        let call = ToolCall {
            name: name.to_string(),
            arguments,
            id: String::new(),
        };
        Ok(self.execute(&call).await?.output)
    }

    /// All tool schemas, ordered by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Tool names, ordered
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

const CALCULATOR_CHARS: &str = "0123456789+-*/(). ";

/// Calculator tool - evaluates basic arithmetic
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "calculator",
            "Evaluate a mathematical expression. Use this for any math calculations.",
        )
        .param(ParameterSchema::string(
            "expression",
            "A mathematical expression (e.g., '2 + 2', '10 * 5 + 3')",
        ))
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let expr = call
            .str_arg("expression")
            .ok_or_else(|| AgentError::invalid_arguments("calculator", "missing expression"))?;

        if !expr.chars().all(|c| CALCULATOR_CHARS.contains(c)) {
            return Ok(ToolResult::failure(
                "calculator",
                "Error: Expression contains invalid characters",
            ));
        }

        match evaluate_expression(expr) {
            Ok(value) => Ok(ToolResult::success(
                "calculator",
                format!("The result is: {}", format_number(value)),
            )),
            Err(e) => Ok(ToolResult::failure(
                "calculator",
                format!("Error calculating: {e}"),
            )),
        }
    }
}

/// Word length tool - counts characters in a word
pub struct WordLengthTool;

#[async_trait]
impl Tool for WordLengthTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("get_word_length", "Get the length of a word")
            .param(ParameterSchema::string("word", "The word to measure"))
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let word = call
            .str_arg("word")
            .ok_or_else(|| AgentError::invalid_arguments("get_word_length", "missing word"))?;

        Ok(ToolResult::success(
            "get_word_length",
            format!("The word '{word}' has {} characters", word.chars().count()),
        ))
    }
}

/// Longest expression the calculator accepts
const MAX_EXPRESSION_LEN: usize = 65_536;

/// Calculator value; `float` follows Python numeric rules (`/` and decimal
/// literals make floats, `+ - * // **` on integers stay integral)
#[derive(Clone, Copy, Debug, PartialEq)]
struct Number {
    value: f64,
    float: bool,
}

impl Number {
    const fn float(value: f64) -> Self {
        Self { value, float: true }
    }
}

fn format_number(number: Number) -> String {
    if number.float {
        format!("{:?}", number.value)
    } else {
        // + 0.0 folds -0 into 0
        format!("{:.0}", number.value + 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
    Neg,
    Pos,
    Open,
}

impl Op {
    const fn precedence(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div | Self::FloorDiv => 2,
            Self::Neg | Self::Pos => 3,
            Self::Pow => 4,
        }
    }

    /// Whether `self` on the stack must be applied before pushing `next`
    const fn binds_before(self, next: Self) -> bool {
        match self {
            Self::Open => false,
            _ if matches!(next, Self::Pow) => self.precedence() > next.precedence(),
            _ => self.precedence() >= next.precedence(),
        }
    }
}

/// Operator-precedence evaluator for `+ - * / // **`, unary signs and
/// parentheses. Works on explicit stacks, so nesting depth and length are
/// bounded only by `MAX_EXPRESSION_LEN`.
fn evaluate_expression(expr: &str) -> std::result::Result<Number, String> {
    if expr.len() > MAX_EXPRESSION_LEN {
        return Err(format!(
            "expression longer than {MAX_EXPRESSION_LEN} characters"
        ));
    }

    let chars: Vec<char> = expr.chars().collect();
    let mut values: Vec<Number> = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut expect_operand = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if expect_operand {
            match c {
                '0'..='9' | '.' => {
                    let start = i;
                    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                        i += 1;
                    }
                    let literal: String = chars[start..i].iter().collect();
                    values.push(parse_number(&literal)?);
                    expect_operand = false;
                    continue;
                }
                '(' => ops.push(Op::Open),
                '-' => ops.push(Op::Neg),
                '+' => ops.push(Op::Pos),
                _ => return Err(format!("invalid syntax near '{c}'")),
            }
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let op = match c {
            ')' => {
                loop {
                    match ops.pop() {
                        Some(Op::Open) => break,
                        Some(op) => apply(&mut values, op)?,
                        None => return Err("unbalanced parentheses".into()),
                    }
                }
                i += 1;
                continue;
            }
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' if next == Some('*') => {
                i += 1;
                Op::Pow
            }
            '*' => Op::Mul,
            '/' if next == Some('/') => {
                i += 1;
                Op::FloorDiv
            }
            '/' => Op::Div,
            _ => return Err(format!("invalid syntax near '{c}'")),
        };

        while let Some(&top) = ops.last() {
            if !top.binds_before(op) {
                break;
            }
            ops.pop();
            apply(&mut values, top)?;
        }
        ops.push(op);
        expect_operand = true;
        i += 1;
    }

    if expect_operand {
        return Err("unexpected end of expression".into());
    }
    while let Some(op) = ops.pop() {
        if op == Op::Open {
            return Err("unbalanced parentheses".into());
        }
        apply(&mut values, op)?;
    }

    match (values.pop(), values.is_empty()) {
        (Some(result), true) => Ok(result),
        _ => Err("invalid syntax".into()),
    }
}

fn parse_number(literal: &str) -> std::result::Result<Number, String> {
    let value: f64 = literal
        .parse()
        .map_err(|_| format!("invalid number '{literal}'"))?;
    if !value.is_finite() {
        return Err(format!("number '{literal}' out of range"));
    }
    Ok(Number {
        value,
        float: literal.contains('.'),
    })
}

fn apply(values: &mut Vec<Number>, op: Op) -> std::result::Result<(), String> {
    let rhs = values.pop().ok_or("invalid syntax")?;
    let result = match op {
        Op::Neg => Number {
            value: -rhs.value,
            ..rhs
        },
        Op::Pos => rhs,
        Op::Open => return Err("unbalanced parentheses".into()),
        _ => {
            let lhs = values.pop().ok_or("invalid syntax")?;
            binary(op, lhs, rhs)?
        }
    };

    if !result.value.is_finite() {
        return Err("result out of range".into());
    }
    values.push(result);
    Ok(())
}

#[allow(clippy::float_cmp)]
fn binary(op: Op, lhs: Number, rhs: Number) -> std::result::Result<Number, String> {
    let float = lhs.float || rhs.float;
    let number = |value| Number { value, float };

    match op {
        Op::Add => Ok(number(lhs.value + rhs.value)),
        Op::Sub => Ok(number(lhs.value - rhs.value)),
        Op::Mul => Ok(number(lhs.value * rhs.value)),
        Op::Div if rhs.value == 0.0 => Err("division by zero".into()),
        Op::Div => Ok(Number::float(lhs.value / rhs.value)),
        Op::FloorDiv if rhs.value == 0.0 => Err("integer division or modulo by zero".into()),
        Op::FloorDiv => Ok(number((lhs.value / rhs.value).floor())),
        Op::Pow if lhs.value == 0.0 && rhs.value < 0.0 => {
            Err("0.0 cannot be raised to a negative power".into())
        }
        Op::Pow => Ok(Number {
            value: lhs.value.powf(rhs.value),
            float: float || rhs.value < 0.0,
        }),
        Op::Neg | Op::Pos | Op::Open => Err("invalid syntax".into()),
    }
}
