//! Ordered, name-unique tool collections and their wire schemas

use crate::tool::FunctionTool;
use serde_json::{json, Map, Value};

const GOOGLE_SUPPORTED_TYPES: [&str; 7] = [
    "string", "number", "integer", "boolean", "array", "object", "null",
];

const GOOGLE_SUPPORTED_FIELDS: [&str; 9] = [
    "title",
    "description",
    "enum",
    "minimum",
    "maximum",
    "maxItems",
    "minItems",
    "nullable",
    "required",
];

#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<FunctionTool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool with the same name in place
    pub fn add_tool(&mut self, tool: FunctionTool) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn remove_tool(&mut self, name: &str) -> Option<FunctionTool> {
        let idx = self.tools.iter().position(|t| t.name == name)?;
        Some(self.tools.remove(idx))
    }

    pub fn get_tool(&self, name: &str) -> Option<&FunctionTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn get_tool_mut(&mut self, name: &str) -> Option<&mut FunctionTool> {
        self.tools.iter_mut().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FunctionTool> {
        self.tools.iter()
    }

    /// Keep only the tools matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&FunctionTool) -> bool) {
        self.tools.retain(keep);
    }

    /// Copy without deactivated tools
    pub fn active_only(&self) -> ToolSet {
        self.tools.iter().filter(|t| t.active).cloned().collect()
    }

    /// OpenAI function-calling schema
    ///
    /// `parameters` is left out only when `omit_empty_parameter_field` is set
    /// and the schema declares no properties.
    pub fn openai_schema(&self, omit_empty_parameter_field: bool) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                let mut function = Map::new();
                function.insert("name".into(), json!(tool.name));
                function.insert("description".into(), json!(tool.description));
                if has_properties(tool.parameters()) || !omit_empty_parameter_field {
                    function.insert("parameters".into(), tool.parameters().clone());
                }
                json!({"type": "function", "function": function})
            })
            .collect()
    }

    /// Anthropic tool schema
    pub fn anthropic_schema(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                let params = tool.parameters();
                let mut input_schema = Map::new();
                input_schema.insert("type".into(), json!("object"));
                if params.as_object().is_some_and(|p| !p.is_empty()) {
                    input_schema.insert(
                        "properties".into(),
                        params.get("properties").cloned().unwrap_or_else(|| json!({})),
                    );
                    input_schema.insert(
                        "required".into(),
                        params.get("required").cloned().unwrap_or_else(|| json!([])),
                    );
                }
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": input_schema,
                })
            })
            .collect()
    }

    /// Google GenAI function declarations
    ///
    /// Returns an empty object when the set is empty.
    pub fn google_schema(&self) -> Value {
        let declarations: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                let mut decl = Map::new();
                decl.insert("name".into(), json!(tool.name));
                decl.insert("description".into(), json!(tool.description));
                if tool.parameters().as_object().is_some_and(|p| !p.is_empty()) {
                    decl.insert("parameters".into(), convert_google_schema(tool.parameters()));
                }
                Value::Object(decl)
            })
            .collect();

        if declarations.is_empty() {
            json!({})
        } else {
            json!({ "function_declarations": declarations })
        }
    }
}

impl FromIterator<FunctionTool> for ToolSet {
    fn from_iter<I: IntoIterator<Item = FunctionTool>>(iter: I) -> Self {
        let mut set = ToolSet::new();
        for tool in iter {
            set.add_tool(tool);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ToolSet {
    type Item = &'a FunctionTool;
    type IntoIter = std::slice::Iter<'a, FunctionTool>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.iter()
    }
}

fn has_properties(schema: &Value) -> bool {
    match schema.get("properties") {
        Some(Value::Object(props)) => !props.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Down-convert a JSON schema to the subset Gemini accepts
fn convert_google_schema(schema: &Value) -> Value {
    let Some(schema) = schema.as_object() else {
        return json!({"type": "null"});
    };

    if let Some(any_of) = schema.get("anyOf") {
        let variants = any_of
            .as_array()
            .map(|v| v.iter().map(convert_google_schema).collect::<Vec<_>>())
            .unwrap_or_default();
        return json!({ "anyOf": variants });
    }

    let mut result = Map::new();

    match schema.get("type").and_then(Value::as_str) {
        Some(ty) if GOOGLE_SUPPORTED_TYPES.contains(&ty) => {
            result.insert("type".into(), json!(ty));
            if let Some(format) = schema.get("format").and_then(Value::as_str) {
                if google_format_supported(ty, format) {
                    result.insert("format".into(), json!(format));
                }
            }
        }
        _ => {
            result.insert("type".into(), json!("null"));
        }
    }

    for field in GOOGLE_SUPPORTED_FIELDS {
        if let Some(value) = schema.get(field) {
            result.insert(field.into(), value.clone());
        }
    }

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        let properties: Map<String, Value> = props
            .iter()
            .map(|(key, value)| {
                let mut converted = convert_google_schema(value);
                if let Some(obj) = converted.as_object_mut() {
                    obj.remove("default");
                }
                (key.clone(), converted)
            })
            .collect();
        if !properties.is_empty() {
            result.insert("properties".into(), Value::Object(properties));
        }
    }

    if let Some(items) = schema.get("items") {
        result.insert("items".into(), convert_google_schema(items));
    }

    Value::Object(result)
}

fn google_format_supported(ty: &str, format: &str) -> bool {
    match ty {
        "string" => matches!(format, "enum" | "date-time"),
        "integer" => matches!(format, "int32" | "int64"),
        "number" => matches!(format, "float" | "double"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, params: Value) -> FunctionTool {
        FunctionTool::new(name, format!("{} tool", name), params).unwrap()
    }

    #[test]
    fn test_add_replaces_same_name() {
        let mut set = ToolSet::new();
        set.add_tool(tool("search", json!({"type": "object"})));
        set.add_tool(tool("clock", json!({"type": "object"})));
        let mut replacement = tool("search", json!({"type": "object"}));
        replacement.description = "v2".into();
        set.add_tool(replacement);

        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["search", "clock"]);
        assert_eq!(set.get_tool("search").unwrap().description, "v2");

        assert!(set.remove_tool("search").is_some());
        assert!(set.remove_tool("search").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_active_only() {
        let mut set = ToolSet::new();
        set.add_tool(tool("a", json!({"type": "object"})));
        let mut b = tool("b", json!({"type": "object"}));
        b.active = false;
        set.add_tool(b);

        assert_eq!(set.active_only().names(), vec!["a"]);
    }

    #[test]
    fn test_openai_schema_omits_empty_parameters() {
        let mut set = ToolSet::new();
        set.add_tool(tool("empty", json!({"type": "object", "properties": {}})));
        set.add_tool(tool(
            "search",
            json!({"type": "object", "properties": {"q": {"type": "string"}}}),
        ));

        let omitted = set.openai_schema(true);
        assert!(omitted[0]["function"].get("parameters").is_none());
        assert!(omitted[1]["function"].get("parameters").is_some());

        let kept = set.openai_schema(false);
        assert_eq!(kept[0]["type"], "function");
        assert_eq!(kept[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_anthropic_schema() {
        let mut set = ToolSet::new();
        set.add_tool(tool(
            "search",
            json!({"type": "object", "properties": {"q": {"type": "string"}}, "required": ["q"]}),
        ));
        let schema = set.anthropic_schema();
        assert_eq!(schema[0]["name"], "search");
        assert_eq!(schema[0]["input_schema"]["type"], "object");
        assert_eq!(schema[0]["input_schema"]["required"], json!(["q"]));
    }

    #[test]
    fn test_google_schema_down_conversion() {
        let mut set = ToolSet::new();
        set.add_tool(tool(
            "book",
            json!({
                "type": "object",
                "properties": {
                    "when": {"type": "string", "format": "date-time", "default": "now"},
                    "seats": {"type": "integer", "format": "uint8", "minimum": 1},
                    "ref": {"type": "uuid"},
                    "tags": {"type": "array", "items": {"type": "string", "format": "email"}},
                    "choice": {"anyOf": [{"type": "string"}, {"type": "tuple"}]}
                },
                "required": ["when"],
                "additionalProperties": false
            }),
        ));

        let schema = set.google_schema();
        let params = &schema["function_declarations"][0]["parameters"];
        assert_eq!(params["type"], "object");
        assert_eq!(params["required"], json!(["when"]));
        assert!(params.get("additionalProperties").is_none());

        let props = &params["properties"];
        assert_eq!(props["when"], json!({"type": "string", "format": "date-time"}));
        assert_eq!(props["seats"], json!({"type": "integer", "minimum": 1}));
        assert_eq!(props["ref"], json!({"type": "null"}));
        assert_eq!(props["tags"]["items"], json!({"type": "string"}));
        assert_eq!(
            props["choice"],
            json!({"anyOf": [{"type": "string"}, {"type": "null"}]})
        );
    }

    #[test]
    fn test_empty_google_schema() {
        assert_eq!(ToolSet::new().google_schema(), json!({}));
    }

    #[test]
    fn test_schemas_keep_names_and_descriptions() {
        let set: ToolSet = ["a", "b", "c"]
            .into_iter()
            .map(|n| tool(n, json!({"type": "object", "properties": {"x": {"type": "number"}}})))
            .collect();

        let openai = set.openai_schema(false);
        let anthropic = set.anthropic_schema();
        let google = set.google_schema();
        for (i, t) in set.iter().enumerate() {
            assert_eq!(openai[i]["function"]["name"], json!(t.name));
            assert_eq!(openai[i]["function"]["description"], json!(t.description));
            assert_eq!(anthropic[i]["name"], json!(t.name));
            assert_eq!(anthropic[i]["description"], json!(t.description));
            assert_eq!(google["function_declarations"][i]["name"], json!(t.name));
            assert_eq!(google["function_declarations"][i]["description"], json!(t.description));
        }
    }
}
