// Function-calling schemas offered to the generation service.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Name of the single function the model may call to hand back the
/// generated table as one text blob. The parser only honors calls with
/// this exact name.
pub const CREATE_CSV_FILE: &str = "create_csv_file";

/// One function definition in the shape the chat-completions API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Argument payload of a `create_csv_file` call, decoded from the
/// JSON-string `arguments` field.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCsvFileArgs {
    pub text: String,
}

/// The schema for `create_csv_file`: a single required `text` property
/// holding the file contents.
pub fn create_csv_file_function() -> FunctionDef {
    FunctionDef {
        name: CREATE_CSV_FILE.to_string(),
        description: "CSV 形式のファイルを作成する".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "ファイルの内容",
                },
            },
            "required": ["text"],
        }),
    }
}
