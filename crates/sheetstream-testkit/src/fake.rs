use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use sheetstream_client::{ApiConfig, ApiRequest, ApiResponse, Connector, Method, Transport};
use sheetstream_core::{AccessMode, SheetError, SheetId, TabularMatrix, ValueRange};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Which remote operation a request performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    GetSpreadsheet,
    AddSheet,
    DeleteSheet,
    UpdateSheetProperties,
    AutoResizeRows,
    AutoResizeColumns,
    GetValues,
    AppendValues,
    ClearValues,
    CopyTo,
}

/// A request as the fake saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub kind: Option<RequestKind>,
    pub request: ApiRequest,
}

#[derive(Debug, Clone)]
struct FakeSheet {
    id: SheetId,
    title: String,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, Vec<FakeSheet>>,
    next_id: i64,
    failures: HashMap<RequestKind, VecDeque<u16>>,
    log: Vec<RecordedRequest>,
    modes: Vec<AccessMode>,
}

enum Route {
    Spreadsheet { container: String },
    BatchUpdate { container: String },
    Values { container: String, name: String },
    Append { container: String, name: String },
    Clear { container: String, name: String },
    CopyTo { container: String, sheet_id: SheetId },
}

/// In-memory stand-in for the spreadsheet REST API.
///
/// Keeps containers and sheets in memory, answers the endpoints the client
/// uses, records every request and can be told to fail the next request of
/// a given kind. Clones share the same state.
#[derive(Debug, Clone)]
pub struct FakeSheets {
    api: ApiConfig,
    state: Arc<Mutex<State>>,
}

impl Default for FakeSheets {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSheets {
    pub const BASE_URL: &'static str = "https://sheets.test";

    pub fn new() -> Self {
        Self {
            api: ApiConfig::with_base_url(Self::BASE_URL),
            state: Arc::new(Mutex::new(State {
                next_id: 100,
                ..State::default()
            })),
        }
    }

    /// API configuration pointing at this fake
    pub fn api_config(&self) -> ApiConfig {
        self.api.clone()
    }

    /// Create a container holding one empty sheet `Sheet1` with id 0
    pub fn add_spreadsheet(&self, container: &str) {
        self.lock().containers.insert(
            container.to_string(),
            vec![FakeSheet {
                id: SheetId(0),
                title: "Sheet1".to_string(),
                rows: Vec::new(),
            }],
        );
    }

    /// Add a sheet with content to an existing container
    pub fn add_sheet(&self, container: &str, title: &str, rows: TabularMatrix) -> SheetId {
        let mut state = self.lock();
        let id = state.allocate_id();
        state
            .containers
            .get_mut(container)
            .unwrap_or_else(|| panic!("unknown container {}", container))
            .push(FakeSheet {
                id,
                title: title.to_string(),
                rows: rows.into_rows(),
            });
        id
    }

    /// Current content of a sheet, `None` if there is no such sheet
    pub fn values(&self, container: &str, title: &str) -> Option<TabularMatrix> {
        let state = self.lock();
        state
            .sheet_by_title(container, title)
            .map(|sheet| TabularMatrix::from(sheet.rows.clone()))
    }

    pub fn sheet_id(&self, container: &str, title: &str) -> Option<SheetId> {
        self.lock()
            .sheet_by_title(container, title)
            .map(|sheet| sheet.id)
    }

    /// Sheet titles of a container in tab order
    pub fn titles(&self, container: &str) -> Vec<String> {
        self.lock()
            .containers
            .get(container)
            .map(|sheets| sheets.iter().map(|s| s.title.clone()).collect())
            .unwrap_or_default()
    }

    /// Answer the next request of `kind` with `status` instead of serving it
    pub fn fail_next(&self, kind: RequestKind, status: u16) {
        self.lock()
            .failures
            .entry(kind)
            .or_default()
            .push_back(status);
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    /// Number of requests of one kind received so far
    pub fn count(&self, kind: RequestKind) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.kind == Some(kind))
            .count()
    }

    /// Access modes transports were requested for, in order
    pub fn requested_modes(&self) -> Vec<AccessMode> {
        self.lock().modes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test must not poison the fake for its own assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn route(&self, request: &ApiRequest) -> Option<Route> {
        let root = format!("{}/", self.api.spreadsheets_root());
        let rest = request.url.strip_prefix(&root)?;
        let path = rest.split('?').next().unwrap_or_default();

        match path.split_once('/') {
            None => match path.split_once(':') {
                Some((container, "batchUpdate")) => Some(Route::BatchUpdate {
                    container: decode(container),
                }),
                Some(_) => None,
                None => Some(Route::Spreadsheet {
                    container: decode(path),
                }),
            },
            Some((container, tail)) => {
                let container = decode(container);
                if let Some(name) = tail.strip_prefix("values/") {
                    match name.rsplit_once(':') {
                        Some((name, "append")) => Some(Route::Append {
                            container,
                            name: decode(name),
                        }),
                        Some((name, "clear")) => Some(Route::Clear {
                            container,
                            name: decode(name),
                        }),
                        Some(_) => None,
                        None => Some(Route::Values {
                            container,
                            name: decode(name),
                        }),
                    }
                } else {
                    let id = tail.strip_prefix("sheets/")?.strip_suffix(":copyTo")?;
                    Some(Route::CopyTo {
                        container,
                        sheet_id: SheetId(id.parse().ok()?),
                    })
                }
            }
        }
    }
}

impl Transport for FakeSheets {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SheetError> {
        let route = self.route(request);
        let kind = route.as_ref().and_then(|r| kind_of(r, request));

        let mut state = self.lock();
        state.log.push(RecordedRequest {
            kind,
            request: request.clone(),
        });

        let Some(route) = route else {
            return Ok(error_response(404, "Requested entity was not found."));
        };

        if let Some(kind) = kind {
            if let Some(status) = state.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
                tracing::debug!(?kind, status, "injected failure");
                return Ok(error_response(status, "Injected failure"));
            }
        }

        Ok(state.serve(route, request))
    }
}

impl Connector for FakeSheets {
    fn connect(&self, mode: AccessMode) -> Result<Arc<dyn Transport>, SheetError> {
        self.lock().modes.push(mode);
        Ok(Arc::new(self.clone()))
    }
}

impl State {
    fn allocate_id(&mut self) -> SheetId {
        let id = SheetId(self.next_id);
        self.next_id += 1;
        id
    }

    fn sheet_by_title(&self, container: &str, title: &str) -> Option<&FakeSheet> {
        self.containers.get(container)?.iter().find(|s| s.title == title)
    }

    fn serve(&mut self, route: Route, request: &ApiRequest) -> ApiResponse {
        match (route, request.method) {
            (Route::Spreadsheet { container }, Method::Get) => self.get_spreadsheet(&container),
            (Route::BatchUpdate { container }, Method::Post) => {
                self.batch_update(&container, request.body.as_ref())
            }
            (Route::Values { container, name }, Method::Get) => self.get_values(&container, &name),
            (Route::Append { container, name }, Method::Post) => {
                self.append(&container, &name, request.body.as_ref())
            }
            (Route::Clear { container, name }, Method::Post) => self.clear(&container, &name),
            (Route::CopyTo { container, sheet_id }, Method::Post) => {
                self.copy_to(&container, sheet_id, request.body.as_ref())
            }
            _ => error_response(404, "Requested entity was not found."),
        }
    }

    fn spreadsheet_json(&self, container: &str) -> Value {
        let sheets: Vec<Value> = self.containers[container]
            .iter()
            .enumerate()
            .map(|(index, sheet)| {
                json!({"properties": {"sheetId": sheet.id, "title": sheet.title, "index": index}})
            })
            .collect();
        json!({ "spreadsheetId": container, "sheets": sheets })
    }

    fn get_spreadsheet(&self, container: &str) -> ApiResponse {
        if !self.containers.contains_key(container) {
            return error_response(404, "Requested entity was not found.");
        }
        ok_json(self.spreadsheet_json(container))
    }

    fn batch_update(&mut self, container: &str, body: Option<&Value>) -> ApiResponse {
        let Some(sheets) = self.containers.get(container) else {
            return error_response(404, "Requested entity was not found.");
        };
        let Some(requests) = body.and_then(|b| b["requests"].as_array()) else {
            return error_response(400, "Invalid requests: missing 'requests'");
        };

        // Applied to a copy so a failing batch leaves nothing behind
        let mut working = sheets.clone();
        let mut next_id = self.next_id;
        for request in requests {
            if let Err(message) = apply_structural(&mut working, &mut next_id, request) {
                return error_response(400, &message);
            }
        }
        self.containers.insert(container.to_string(), working);
        self.next_id = next_id;

        let mut response = json!({
            "spreadsheetId": container,
            "replies": requests.iter().map(|_| json!({})).collect::<Vec<_>>(),
        });
        let include = body
            .and_then(|b| b["includeSpreadsheetInResponse"].as_bool())
            .unwrap_or(false);
        if include {
            response["updatedSpreadsheet"] = self.spreadsheet_json(container);
        }
        ok_json(response)
    }

    fn get_values(&self, container: &str, name: &str) -> ApiResponse {
        let Some(sheet) = self.sheet_by_title(container, name) else {
            return error_response(400, &format!("Unable to parse range: {}", name));
        };

        let mut body = json!({
            "range": format!("{}!A1:Z{}", sheet.title, sheet.rows.len().max(1000)),
            "majorDimension": "ROWS",
        });
        // The API leaves out `values` for a range without data
        if sheet.rows.iter().any(|row| !row.is_empty()) {
            body["values"] = json!(sheet.rows);
        }
        ok_json(body)
    }

    fn append(&mut self, container: &str, name: &str, body: Option<&Value>) -> ApiResponse {
        let parsed = body
            .cloned()
            .map(serde_json::from_value::<ValueRange>)
            .and_then(Result::ok)
            .map(ValueRange::into_matrix);
        let rows = match parsed {
            Some(Ok(matrix)) => matrix.into_rows(),
            _ => return error_response(400, "Invalid value range in request body"),
        };

        let Some(sheet) = self
            .containers
            .get_mut(container)
            .and_then(|sheets| sheets.iter_mut().find(|s| s.title == name))
        else {
            return error_response(400, &format!("Unable to parse range: {}", name));
        };

        let updated_rows = rows.len();
        sheet.rows.extend(rows);
        ok_json(json!({
            "spreadsheetId": container,
            "updates": {"updatedRange": name, "updatedRows": updated_rows},
        }))
    }

    fn clear(&mut self, container: &str, name: &str) -> ApiResponse {
        let Some(sheet) = self
            .containers
            .get_mut(container)
            .and_then(|sheets| sheets.iter_mut().find(|s| s.title == name))
        else {
            return error_response(400, &format!("Unable to parse range: {}", name));
        };
        sheet.rows.clear();
        ok_json(json!({"spreadsheetId": container, "clearedRange": name}))
    }

    fn copy_to(&mut self, container: &str, sheet_id: SheetId, body: Option<&Value>) -> ApiResponse {
        let Some(source) = self
            .containers
            .get(container)
            .and_then(|sheets| sheets.iter().find(|s| s.id == sheet_id))
            .cloned()
        else {
            return error_response(404, "Requested entity was not found.");
        };
        let Some(destination) = body.and_then(|b| b["destinationSpreadsheetId"].as_str()) else {
            return error_response(400, "destinationSpreadsheetId is required");
        };
        if !self.containers.contains_key(destination) {
            return error_response(404, "Requested entity was not found.");
        }

        let id = self.allocate_id();
        let sheets = self
            .containers
            .get_mut(destination)
            .expect("destination checked above");
        let base = format!("Copy of {}", source.title);
        let mut title = base.clone();
        let mut suffix = 2;
        while sheets.iter().any(|s| s.title == title) {
            title = format!("{} {}", base, suffix);
            suffix += 1;
        }
        sheets.push(FakeSheet {
            id,
            title: title.clone(),
            rows: source.rows,
        });

        ok_json(json!({
            "sheetId": id,
            "title": title,
            "index": sheets.len() - 1,
            "sheetType": "GRID",
        }))
    }
}

fn apply_structural(
    sheets: &mut Vec<FakeSheet>,
    next_id: &mut i64,
    request: &Value,
) -> Result<(), String> {
    if let Some(add) = request.get("addSheet") {
        let title = add["properties"]["title"]
            .as_str()
            .ok_or("addSheet requires a title")?;
        if sheets.iter().any(|s| s.title == title) {
            return Err(format!(
                "A sheet with the name \"{}\" already exists. Please enter another name.",
                title
            ));
        }
        let id = match add["properties"]["sheetId"].as_i64() {
            Some(id) => id,
            None => {
                *next_id += 1;
                *next_id - 1
            }
        };
        sheets.push(FakeSheet {
            id: SheetId(id),
            title: title.to_string(),
            rows: Vec::new(),
        });
        return Ok(());
    }

    if let Some(delete) = request.get("deleteSheet") {
        let id = delete["sheetId"].as_i64().ok_or("deleteSheet requires a sheetId")?;
        let index = find_index(sheets, id)?;
        sheets.remove(index);
        return Ok(());
    }

    if let Some(update) = request.get("updateSheetProperties") {
        let id = update["properties"]["sheetId"]
            .as_i64()
            .ok_or("updateSheetProperties requires a sheetId")?;
        let fields = update["fields"].as_str().unwrap_or_default();
        let index = find_index(sheets, id)?;
        if fields.split(',').any(|f| f.trim() == "title") {
            let title = update["properties"]["title"]
                .as_str()
                .ok_or("title missing from properties")?;
            if sheets.iter().any(|s| s.title == title && s.id != SheetId(id)) {
                return Err(format!("A sheet with the name \"{}\" already exists.", title));
            }
            sheets[index].title = title.to_string();
        }
        return Ok(());
    }

    if let Some(resize) = request.get("autoResizeDimensions") {
        let id = resize["dimensions"]["sheetId"]
            .as_i64()
            .ok_or("autoResizeDimensions requires a sheetId")?;
        find_index(sheets, id)?;
        return Ok(());
    }

    Err(format!("Unsupported request: {}", request))
}

fn find_index(sheets: &[FakeSheet], id: i64) -> Result<usize, String> {
    sheets
        .iter()
        .position(|s| s.id == SheetId(id))
        .ok_or_else(|| format!("No grid with id: {}", id))
}

fn kind_of(route: &Route, request: &ApiRequest) -> Option<RequestKind> {
    Some(match route {
        Route::Spreadsheet { .. } => RequestKind::GetSpreadsheet,
        Route::Values { .. } => RequestKind::GetValues,
        Route::Append { .. } => RequestKind::AppendValues,
        Route::Clear { .. } => RequestKind::ClearValues,
        Route::CopyTo { .. } => RequestKind::CopyTo,
        Route::BatchUpdate { .. } => {
            let first = request.body.as_ref()?["requests"].get(0)?;
            if first.get("addSheet").is_some() {
                RequestKind::AddSheet
            } else if first.get("deleteSheet").is_some() {
                RequestKind::DeleteSheet
            } else if first.get("updateSheetProperties").is_some() {
                RequestKind::UpdateSheetProperties
            } else {
                match first["autoResizeDimensions"]["dimensions"]["dimension"].as_str()? {
                    "ROWS" => RequestKind::AutoResizeRows,
                    "COLUMNS" => RequestKind::AutoResizeColumns,
                    _ => return None,
                }
            }
        }
    })
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn ok_json(body: Value) -> ApiResponse {
    ApiResponse::new(200, "OK", body.to_string())
}

fn error_response(status: u16, message: &str) -> ApiResponse {
    let (status_text, code) = match status {
        400 => ("Bad Request", "INVALID_ARGUMENT"),
        401 => ("Unauthorized", "UNAUTHENTICATED"),
        403 => ("Forbidden", "PERMISSION_DENIED"),
        404 => ("Not Found", "NOT_FOUND"),
        429 => ("Too Many Requests", "RESOURCE_EXHAUSTED"),
        503 => ("Service Unavailable", "UNAVAILABLE"),
        _ => ("Internal Server Error", "INTERNAL"),
    };
    let body = json!({"error": {"code": status, "message": message, "status": code}});
    ApiResponse::new(status, status_text, body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetstream_client::SheetDirectory;

    fn directory(fake: &FakeSheets) -> SheetDirectory {
        SheetDirectory::new(Arc::new(fake.clone()), fake.api_config())
    }

    #[test]
    fn test_routes_requests() {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        let dir = directory(&fake);

        assert_eq!(dir.find_sheet_id("doc", "Sheet1").unwrap(), Some(SheetId(0)));
        let id = dir.create_sheet("doc", "Q1 / draft").unwrap();
        dir.append_values("doc", "Q1 / draft", &TabularMatrix::from_rows([["a"]]))
            .unwrap();
        assert_eq!(
            dir.get_values("doc", "Q1 / draft").unwrap(),
            TabularMatrix::from_rows([["a"]])
        );
        dir.resize_dimensions_to_fit("doc", id).unwrap();

        let kinds: Vec<Option<RequestKind>> = fake.requests().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Some(RequestKind::GetSpreadsheet),
                Some(RequestKind::AddSheet),
                Some(RequestKind::AppendValues),
                Some(RequestKind::GetValues),
                Some(RequestKind::AutoResizeRows),
                Some(RequestKind::AutoResizeColumns),
            ]
        );
    }

    #[test]
    fn test_empty_sheet_omits_values() {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        let err = directory(&fake).get_values("doc", "Sheet1").unwrap_err();
        assert!(matches!(err, SheetError::MalformedResponse(_)));
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        fake.fail_next(RequestKind::GetSpreadsheet, 503);
        let dir = directory(&fake);

        assert_eq!(dir.list_sheets("doc").unwrap_err().status_code(), Some(503));
        assert_eq!(dir.list_sheets("doc").unwrap().len(), 1);
    }

    #[test]
    fn test_copy_names_do_not_collide() {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        let dir = directory(&fake);

        let first = dir.duplicate_sheet("doc", SheetId(0), "doc").unwrap();
        let second = dir.duplicate_sheet("doc", SheetId(0), "doc").unwrap();
        assert_eq!(first.name, "Copy of Sheet1");
        assert_eq!(second.name, "Copy of Sheet1 2");
        assert_ne!(first.sheet_id, second.sheet_id);
    }

    #[test]
    fn test_unknown_sheet_id_is_rejected() {
        let fake = FakeSheets::new();
        fake.add_spreadsheet("doc");
        let err = directory(&fake).delete_sheet("doc", SheetId(42)).unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(fake.titles("doc"), vec!["Sheet1".to_string()]);
    }
}
