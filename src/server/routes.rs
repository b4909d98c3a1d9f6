use crate::search::export::ExportError;
use crate::search::SearchEngine;
use crate::server::api;

pub struct HttpResponse {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status_code: 200,
            content_type,
            body,
        }
    }

    fn json(body: String) -> Self {
        Self::ok("application/json", body)
    }
}

pub fn route_request(engine: &SearchEngine, method: &str, path: &str, body: &str) -> HttpResponse {
    let path = path.split('?').next().unwrap_or(path);
    match (method, path) {
        ("GET", "/") => HttpResponse::ok("text/html; charset=utf-8", index_html()),
        ("GET", "/api/health") => match api::health_payload(engine) {
            Ok(payload) => HttpResponse::json(payload),
            Err(err) => error_response(500, &err.to_string()),
        },
        ("GET", "/api/facets") => match api::facets_payload(engine) {
            Ok(payload) => HttpResponse::json(payload),
            Err(err) => error_response(500, &err.to_string()),
        },
        ("POST", "/api/search") => query_response(api::search_payload(engine, body)),
        ("POST", "/api/results") => query_response(api::results_payload(engine, body)),
        ("POST", "/api/export") => match api::export_payload(engine, body) {
            Ok(csv) => HttpResponse::ok("text/csv; charset=utf-8", csv),
            Err(api::ExportPayloadError::Query(err)) => query_error_response(err),
            Err(api::ExportPayloadError::Export(ExportError::NoData(reason))) => {
                error_response(503, &format!("No data available: {reason}"))
            }
            Err(api::ExportPayloadError::Export(err)) => error_response(500, &err.to_string()),
        },
        _ => error_response(404, "Route not found"),
    }
}

fn query_response(result: Result<String, api::QueryPayloadError>) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse::json(payload),
        Err(err) => query_error_response(err),
    }
}

fn query_error_response(err: api::QueryPayloadError) -> HttpResponse {
    match err {
        api::QueryPayloadError::Parse(err) => {
            error_response(400, &format!("Invalid request body: {err}"))
        }
        api::QueryPayloadError::Validation(validation) => {
            validation_error_response(400, validation)
        }
        api::QueryPayloadError::Encode(err) => error_response(500, &err.to_string()),
    }
}

fn validation_error_response(
    status_code: u16,
    payload: api::ValidationErrorResponse,
) -> HttpResponse {
    let fallback =
        "{\n  \"status\": \"error\",\n  \"message\": \"Validation failed\"\n}".to_string();

    HttpResponse {
        status_code,
        content_type: "application/json",
        body: serde_json::to_string_pretty(&payload).unwrap_or(fallback),
    }
}

fn error_response(status_code: u16, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}

fn index_html() -> String {
    r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>Cap-Exempt H-1B Employer Search</title>
  <style>
    body { font-family: Arial, sans-serif; max-width: 1000px; margin: 24px auto; padding: 0 12px; }
    .card { border: 1px solid #ddd; border-radius: 8px; padding: 14px; margin: 14px 0; }
    label { display:block; margin: 8px 0 4px; font-weight: 600; }
    input, select { width: 100%; padding: 8px; box-sizing: border-box; }
    button { margin-top: 12px; padding: 8px 14px; }
    table { border-collapse: collapse; width: 100%; font-size: 0.9rem; }
    th, td { border-bottom: 1px solid #eee; padding: 4px 6px; text-align: left; white-space: nowrap; }
    pre { background: #f6f6f6; padding: 12px; white-space: pre-wrap; border-radius: 6px; }
  </style>
</head>
<body>
  <h1>Cap-Exempt H-1B Employers</h1>
  <p>Employers that can sponsor H-1B petitions year-round.</p>

  <div class="card">
    <label for="name">Company name</label>
    <input id="name" autocomplete="off" />
    <label for="states">States (comma separated)</label>
    <input id="states" placeholder="CA, MA" autocomplete="off" />
    <label for="category">Organization type</label>
    <select id="category"><option value="">Any</option></select>
    <label for="min-score">Minimum cap-exempt score</label>
    <input id="min-score" type="number" min="0" max="1" step="0.05" value="0.6" />
    <label for="min-approval">Minimum approval rate</label>
    <input id="min-approval" type="number" min="0" max="1" step="0.05" value="0.7" />
    <label><input id="only" type="checkbox" checked style="width:auto" /> Likely cap-exempt only</label>
    <label for="year">Year</label>
    <select id="year"><option>All</option><option>2024</option><option>2025</option></select>
    <button id="search-btn">Search</button>
    <button id="export-btn">Export CSV</button>
  </div>

  <pre id="summary">Ready.</pre>
  <div id="results"></div>

  <script>
    const el = id => document.getElementById(id);

    fetch('/api/facets').then(r => r.json()).then(f => {
      for (const label of f.categories || []) {
        const opt = document.createElement('option');
        opt.textContent = label;
        el('category').appendChild(opt);
      }
    }).catch(() => {});

    function query() {
      const states = el('states').value.split(',').map(s => s.trim().toUpperCase()).filter(Boolean);
      const category = el('category').value;
      return {
        name: el('name').value,
        states,
        categories: category ? [category] : [],
        min_cap_exempt_score: Number(el('min-score').value),
        min_approval_rate: Number(el('min-approval').value),
        cap_exempt_only: el('only').checked,
        year: el('year').value,
      };
    }

    function render(data) {
      el('summary').textContent = data.summary_text || data.message || '';
      const table = data.table || { columns: [], rows: [] };
      const head = '<tr>' + table.columns.map(c => '<th>' + c + '</th>').join('') + '</tr>';
      const body = table.rows.map(r => '<tr>' + r.map(v => '<td>' + (v === null ? '' : v) + '</td>').join('') + '</tr>').join('');
      el('results').innerHTML = '<table>' + head + body + '</table>';
    }

    el('search-btn').addEventListener('click', async () => {
      const response = await fetch('/api/search', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(query()),
      });
      render(await response.json());
    });

    el('export-btn').addEventListener('click', async () => {
      const response = await fetch('/api/export', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(query()),
      });
      if (!response.ok) { render(await response.json()); return; }
      const url = URL.createObjectURL(await response.blob());
      const link = document.createElement('a');
      link.href = url;
      link.download = 'cap_exempt_employers.csv';
      link.click();
      URL.revokeObjectURL(url);
    });
  </script>
</body>
</html>
"#
    .to_string()
}
