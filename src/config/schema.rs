use jsonschema::{Draft, JSONSchema};
use log::{info, warn};
use serde_json::Value;

use crate::error::JobError;

/// Compile the batch file schema bundled with the binary
pub fn load_schema() -> Result<JSONSchema, JobError> {
    /// included batch schema
    static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/batch.json"));
    let schema_json: Value = serde_json::from_str(SCHEMA)
        .map_err(|err| JobError::config(format!("Batch schema isn't valid JSON: {err}")))?;

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_json)
        .map_err(|err| JobError::config(format!("Batch schema doesn't compile: {err}")))
}

/// Check untyped JSON against the schema, collecting every violation into one error
pub fn validate(schema: &JSONSchema, json: &Value) -> Result<(), JobError> {
    info!("Validating batch file against JSON schema");
    schema.validate(json).map_err(|errors| {
        let messages: Vec<String> = errors
            .map(|err| format!("{} (at '{}')", err, err.instance_path))
            .collect();
        warn!("Batch file fails validation");
        JobError::config(format!("Invalid batch file: {}", messages.join("; ")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_batch() {
        let schema = load_schema().unwrap();
        let batch = json!({
            "file_list": ["run.in", ["tpl/sub.sh", "sub.sh"]],
            "param_table": {"T": [300, 400], "id": ["a", "b"]},
            "n_cores_per_job": 4,
            "sleep_time": 0.5,
            "submit": false
        });
        assert!(validate(&schema, &batch).is_ok());
    }

    #[test]
    fn test_invalid_batch() {
        let schema = load_schema().unwrap();
        let cases = [
            json!({"file_list": [["only-one"]]}),
            json!({"file_list": "run.in"}),
            json!({"param_table": {"T": [[1]]}}),
            json!({"n_cores_per_job": 0}),
            json!({"sleep_time": -1}),
            json!({"unknown": true}),
        ];
        for case in cases.iter() {
            assert!(matches!(validate(&schema, case), Err(JobError::Configuration(_))), "{case}");
        }
    }
}
