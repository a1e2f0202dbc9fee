use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::{GoogleSheetsClient, SheetsError, StaticTokenProvider};

fn client_for(server: &MockServer) -> GoogleSheetsClient {
    GoogleSheetsClient::with_base_url(&server.uri(), Arc::new(StaticTokenProvider::new("test-token")))
}

#[tokio::test]
async fn test_get_values_builds_table() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Pacientes!A:Z"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Pacientes!A1:C3",
            "majorDimension": "ROWS",
            "values": [
                ["Carteirinha", "Senha", "Status"],
                ["111", "S-1", "Novo"],
                ["222"]
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let table = client.get_values("sheet-123", "Pacientes!A:Z").await.unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.cell(0, "Status"), Some("Novo"));
    assert_eq!(table.cell(1, "Senha"), None);
}

#[tokio::test]
async fn test_empty_range_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Vazio!A:Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Vazio!A1:Z1000",
            "majorDimension": "ROWS"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get_values("sheet-123", "Vazio!A:Z").await;

    assert_matches!(result, Err(SheetsError::Table(_)));
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Visitas!A:Z"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Visitas!A:Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["Carteirinha"], ["111"]]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let table = client
        .get_values_with_retry("sheet-123", "Visitas!A:Z", 3, "visits")
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn test_retry_returns_last_error_when_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Visitas!A:Z"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get_values_with_retry("sheet-123", "Visitas!A:Z", 2, "visits").await;

    assert_matches!(result, Err(SheetsError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_auth_failure_maps_to_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("The caller does not have permission"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get_values("sheet-123", "Pacientes!A:Z").await;

    assert_matches!(result, Err(SheetsError::Auth(_)));
}

#[tokio::test]
async fn test_update_cell_uses_user_entered_values() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v4/spreadsheets/sheet-123/values/Visitas!K12"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_json(json!({
            "range": "Visitas!K12",
            "majorDimension": "ROWS",
            "values": [["Agendada"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-123",
            "updatedRange": "Visitas!K12",
            "updatedCells": 1
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.update_cell("sheet-123", "Visitas!K12", "Agendada").await.unwrap();
}
