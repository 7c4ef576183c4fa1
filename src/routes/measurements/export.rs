use axum::{
    body::Body,
    http::header::{self, HeaderMap, HeaderValue},
    response::Response,
};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AppError, AppResult};

use super::types::MeasurementResponse;

const CSV_HEADER: &str = "id,system_id,timestamp,local_time,voltage,current,power,irradiance,\
temperature,ambient_temperature,energy,efficiency,created_at\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Ndjson,
}

impl ExportFormat {
    #[must_use]
    pub fn is_bulk(self) -> bool {
        !matches!(self, Self::Json)
    }
}

/// Pick the response format. An explicit `format` query value wins over `Accept`.
pub fn determine_format(query_format: &str, headers: &HeaderMap) -> AppResult<ExportFormat> {
    match query_format.to_lowercase().as_str() {
        "csv" => return Ok(ExportFormat::Csv),
        "ndjson" => return Ok(ExportFormat::Ndjson),
        "json" => {}
        other => {
            return Err(AppError::validation(
                "format",
                format!("unsupported format '{other}', expected json, csv or ndjson"),
            ));
        }
    }

    if let Some(accept) = headers.get(header::ACCEPT)
        && let Ok(accept_str) = accept.to_str()
    {
        if accept_str.contains("application/x-ndjson") {
            return Ok(ExportFormat::Ndjson);
        }
        if accept_str.contains("text/csv") {
            return Ok(ExportFormat::Csv);
        }
    }

    Ok(ExportFormat::Json)
}

fn csv_line(row: &MeasurementResponse) -> Result<String, std::io::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(row).map_err(std::io::Error::other)?;
    let bytes = writer.into_inner().map_err(|e| std::io::Error::other(e.to_string()))?;
    String::from_utf8(bytes).map_err(std::io::Error::other)
}

fn stream_response(
    content_type: &'static str,
    header_line: Option<&'static str>,
    rows: Vec<MeasurementResponse>,
    encode: fn(&MeasurementResponse) -> Result<String, std::io::Error>,
) -> AppResult<Response> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, std::io::Error>>(100);

    tokio::spawn(async move {
        if let Some(line) = header_line {
            if tx.send(Ok(line.to_string())).await.is_err() {
                return;
            }
        }
        for row in &rows {
            let line = encode(row);
            let failed = line.is_err();
            if tx.send(line).await.is_err() || failed {
                break;
            }
        }
    });

    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn build_csv_response(rows: Vec<MeasurementResponse>) -> AppResult<Response> {
    stream_response("text/csv", Some(CSV_HEADER), rows, csv_line)
}

pub fn build_ndjson_response(rows: Vec<MeasurementResponse>) -> AppResult<Response> {
    stream_response("application/x-ndjson", None, rows, |row| {
        serde_json::to_string(row)
            .map(|json| format!("{json}\n"))
            .map_err(std::io::Error::other)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn query_param_beats_accept_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/csv"));

        assert_eq!(determine_format("ndjson", &headers).unwrap(), ExportFormat::Ndjson);
        assert_eq!(determine_format("json", &headers).unwrap(), ExportFormat::Csv);
        assert_eq!(
            determine_format("json", &HeaderMap::new()).unwrap(),
            ExportFormat::Json
        );
        assert!(determine_format("xml", &HeaderMap::new()).is_err());
    }

    #[test]
    fn csv_line_matches_header_columns() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let row = MeasurementResponse {
            id: 3,
            system_id: "PV-001".to_string(),
            timestamp: t,
            local_time: None,
            voltage: Some(230.5),
            current: None,
            power: Some(500.0),
            irradiance: Some(800.0),
            temperature: None,
            ambient_temperature: None,
            energy: None,
            efficiency: None,
            created_at: t,
        };

        let line = csv_line(&row).unwrap();
        assert!(line.starts_with("3,PV-001,2026-03-01T04:00:00Z,,230.5,,500.0,800.0"));
        assert_eq!(
            line.trim_end().split(',').count(),
            CSV_HEADER.trim_end().split(',').count()
        );
    }
}
