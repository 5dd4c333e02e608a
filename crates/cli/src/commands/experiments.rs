//! Experiment registration and sample ingestion commands

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, ChaosResource, IngestSummary, Registration};
use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

/// Row for the resources table
#[derive(Tabled, serde::Serialize)]
struct ResourceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Experiment")]
    experiment_id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Workload")]
    generated_name: String,
    #[tabled(rename = "Selected")]
    selected: String,
}

impl From<&ChaosResource> for ResourceRow {
    fn from(resource: &ChaosResource) -> Self {
        Self {
            id: resource.resource_id,
            experiment_id: resource.chaos_experiment_id,
            name: resource.resource_name.clone(),
            kind: resource.kind.clone(),
            generated_name: resource.generated_name.clone().unwrap_or_default(),
            selected: if resource.kind == "pod" && resource.selected {
                "yes".to_string()
            } else {
                String::new()
            },
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Accepts either a bare array of samples or an `{"items": [...]}` batch
fn ingest_body(payload: Value) -> Result<Value> {
    match payload {
        Value::Array(items) => Ok(json!({ "items": items })),
        Value::Object(map) if map.get("items").map_or(false, Value::is_array) => {
            Ok(Value::Object(map))
        }
        _ => anyhow::bail!("Expected an array of samples or an object with an \"items\" array"),
    }
}

/// Post a batch of raw samples from a file
pub async fn ingest(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let body = ingest_body(read_json(file)?)?;
    let total = body["items"].as_array().map_or(0, Vec::len);

    let summary: IngestSummary = client.post(client.endpoint(&["chaos", "usage"])?, &body).await?;

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            print_success(&format!("Ingested {} of {} samples", summary.written, total))
        }
    }

    Ok(())
}

/// Register an experiment and its resources from a file
pub async fn register(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let request = read_json(file)?;
    let registration: Registration = client.post(client.endpoint(&["chaos"])?, &request).await?;

    match format {
        OutputFormat::Json => print_json(&registration),
        OutputFormat::Table => {
            print_success(&format!(
                "Registered experiment '{}' in namespace '{}' (id {})",
                registration.experiment.chaos_name,
                registration.experiment.namespace,
                registration.experiment.experiment_id
            ));
            if registration.resource_ids.is_empty() {
                print_info("No resources registered");
            } else {
                let ids: Vec<String> = registration
                    .resource_ids
                    .iter()
                    .map(i64::to_string)
                    .collect();
                print_info(&format!("Resource ids: {}", ids.join(", ")));
            }
        }
    }

    Ok(())
}

/// Show registered resources by id
pub async fn show_resources(client: &ApiClient, ids: &[i64], format: OutputFormat) -> Result<()> {
    let joined: Vec<String> = ids.iter().map(i64::to_string).collect();
    let mut url = client.endpoint(&["chaos", "resources"])?;
    url.query_pairs_mut().append_pair("ids", &joined.join(","));
    let resources: Vec<ChaosResource> = client.get(url).await?;

    let rows: Vec<ResourceRow> = resources.iter().map(ResourceRow::from).collect();
    print_table(&rows, format);

    Ok(())
}

/// Delete an experiment and everything recorded for it
pub async fn delete(
    client: &ApiClient,
    chaos_name: &str,
    namespace: &str,
    format: OutputFormat,
) -> Result<()> {
    let mut url = client.endpoint(&["chaos", chaos_name])?;
    url.query_pairs_mut().append_pair("namespace", namespace);
    client.delete(url).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "deleted": chaos_name, "namespace": namespace })),
        OutputFormat::Table => print_success(&format!(
            "Deleted experiment '{}' from namespace '{}'",
            chaos_name, namespace
        )),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_body_wraps_bare_array() {
        let body = ingest_body(json!([{"resourceId": 1}])).unwrap();
        assert_eq!(body["items"][0]["resourceId"], 1);
    }

    #[test]
    fn test_ingest_body_keeps_batch_object() {
        let body = ingest_body(json!({"items": []})).unwrap();
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_ingest_body_rejects_other_shapes() {
        assert!(ingest_body(json!({"samples": []})).is_err());
        assert!(ingest_body(json!(42)).is_err());
    }

    #[tokio::test]
    async fn test_ingest_posts_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("samples.json");
        std::fs::write(
            &file,
            r#"[{"resourceId":1,"measurementTime":"2024-09-12T10:00:00","cpu":5,"memory":50}]"#,
        )
        .unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chaos/usage")
            .match_body(mockito::Matcher::PartialJson(json!({
                "items": [{"resourceId": 1}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"written":1}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        ingest(&client, &file, OutputFormat::Json).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_encodes_name_and_namespace() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/chaos/cpu%23burn")
            .match_query(mockito::Matcher::UrlEncoded(
                "namespace".into(),
                "team a".into(),
            ))
            .with_status(204)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        delete(&client, "cpu#burn", "team a", OutputFormat::Json)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn test_resource_row_marks_selected_pods_only() {
        let pod = ChaosResource {
            resource_id: 1,
            chaos_experiment_id: 7,
            resource_name: "web-abc".to_string(),
            kind: "pod".to_string(),
            generated_name: Some("web-".to_string()),
            selected: true,
        };
        let node = ChaosResource {
            resource_id: 2,
            chaos_experiment_id: 7,
            resource_name: "worker-1".to_string(),
            kind: "node".to_string(),
            generated_name: None,
            selected: false,
        };

        assert_eq!(ResourceRow::from(&pod).selected, "yes");
        assert_eq!(ResourceRow::from(&node).selected, "");
        assert_eq!(ResourceRow::from(&node).generated_name, "");
    }
}
