//! Request and response bodies of the structural endpoints.

use serde::{Deserialize, Serialize};
use sheetstream_core::SheetId;

/// `GET /spreadsheets/{id}` response, reduced to what is used here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    #[serde(default)]
    pub properties: Option<SheetProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<SheetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SheetProperties {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            sheet_id: None,
            title: Some(title.into()),
        }
    }
}

impl Spreadsheet {
    /// Properties of every sheet that reports both an id and a title
    pub fn sheet_properties(&self) -> impl Iterator<Item = (SheetId, &str)> {
        self.sheets.iter().filter_map(|entry| {
            let props = entry.properties.as_ref()?;
            Some((props.sheet_id?, props.title.as_deref()?))
        })
    }

    /// First sheet with exactly this title
    pub fn find_by_title(&self, title: &str) -> Option<SheetId> {
        self.sheet_properties()
            .find(|(_, t)| *t == title)
            .map(|(id, _)| id)
    }
}

/// `POST /spreadsheets/{id}:batchUpdate` body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    pub requests: Vec<StructuralRequest>,
    pub include_spreadsheet_in_response: bool,
}

/// One entry of a batch update; serializes as `{"addSheet": {...}}` etc.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StructuralRequest {
    AddSheet(AddSheet),
    DeleteSheet(DeleteSheet),
    UpdateSheetProperties(UpdateSheetProperties),
    AutoResizeDimensions(AutoResizeDimensions),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddSheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSheet {
    pub sheet_id: SheetId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateSheetProperties {
    pub properties: SheetProperties,
    /// Comma-separated field mask, e.g. `"title"`
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoResizeDimensions {
    pub dimensions: DimensionRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: SheetId,
    pub dimension: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    Rows,
    Columns,
}

/// `POST /spreadsheets/{id}:batchUpdate` response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub updated_spreadsheet: Option<Spreadsheet>,
}

/// `POST /spreadsheets/{id}/sheets/{sheetId}:copyTo` body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySheetRequest {
    pub destination_spreadsheet_id: String,
}
