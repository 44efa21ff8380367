use serde::de::DeserializeOwned;
use serde_json::json;
use sheetstream_core::{
    decode_wire_values, SheetError, SheetId, SheetIdentity, TabularMatrix, ValueRange,
};
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::wire::{
    AddSheet, AutoResizeDimensions, BatchUpdateRequest, BatchUpdateResponse, CopySheetRequest,
    DeleteSheet, Dimension, DimensionRange, SheetProperties, Spreadsheet, StructuralRequest,
    UpdateSheetProperties,
};

/// Primitive operations on the sheets of remote spreadsheets.
///
/// Holds no state besides the transport; every method issues one or more
/// independent requests and returns the first failure.
#[derive(Debug, Clone)]
pub struct SheetDirectory {
    transport: Arc<dyn Transport>,
    api: ApiConfig,
}

impl SheetDirectory {
    pub fn new(transport: Arc<dyn Transport>, api: ApiConfig) -> Self {
        Self { transport, api }
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Fetch container metadata
    pub fn spreadsheet(&self, container: &str) -> Result<Spreadsheet, SheetError> {
        let response = self.execute(ApiRequest::get(self.api.spreadsheet_url(container)))?;
        parse_json(&response, "spreadsheet metadata")
    }

    /// All sheets of a container, in tab order
    pub fn list_sheets(&self, container: &str) -> Result<Vec<SheetIdentity>, SheetError> {
        let spreadsheet = self.spreadsheet(container)?;
        Ok(spreadsheet
            .sheet_properties()
            .map(|(id, title)| SheetIdentity::new(container, id, title))
            .collect())
    }

    /// Look up a sheet id by exact title. The first match wins.
    pub fn find_sheet_id(&self, container: &str, name: &str) -> Result<Option<SheetId>, SheetError> {
        Ok(self.spreadsheet(container)?.find_by_title(name))
    }

    /// Like [`find_sheet_id`](Self::find_sheet_id) but absence is an error
    pub fn sheet_id(&self, container: &str, name: &str) -> Result<SheetId, SheetError> {
        self.find_sheet_id(container, name)?
            .ok_or_else(|| SheetError::not_found(container, name))
    }

    /// Add a sheet and return the id the remote assigned to it
    pub fn create_sheet(&self, container: &str, name: &str) -> Result<SheetId, SheetError> {
        let response = self.batch_update(
            container,
            vec![StructuralRequest::AddSheet(AddSheet {
                properties: SheetProperties::titled(name),
            })],
            true,
        )?;

        let update: BatchUpdateResponse = parse_json(&response, "batch update")?;
        let id = update
            .updated_spreadsheet
            .as_ref()
            .and_then(|spreadsheet| spreadsheet.find_by_title(name))
            .ok_or_else(|| {
                SheetError::MalformedResponse(format!(
                    "created sheet '{}' is missing from the updated spreadsheet",
                    name
                ))
            })?;

        tracing::info!(container, name, sheet_id = %id, "created sheet");
        Ok(id)
    }

    /// Delete a sheet. Unknown ids are reported by the remote as an error.
    pub fn delete_sheet(&self, container: &str, sheet_id: SheetId) -> Result<(), SheetError> {
        self.batch_update(
            container,
            vec![StructuralRequest::DeleteSheet(DeleteSheet { sheet_id })],
            false,
        )?;
        tracing::info!(container, sheet_id = %sheet_id, "deleted sheet");
        Ok(())
    }

    /// Remove every value of a sheet, keeping the sheet and its dimensions
    pub fn clear_values(&self, container: &str, name: &str) -> Result<(), SheetError> {
        self.execute(ApiRequest::post(
            self.api.clear_url(container, name),
            Some(json!({})),
        ))?;
        Ok(())
    }

    /// Append rows after the last populated row
    pub fn append_values(
        &self,
        container: &str,
        name: &str,
        matrix: &TabularMatrix,
    ) -> Result<(), SheetError> {
        let body = ValueRange::for_rows(name, self.api.major_dimension.as_str(), matrix);
        self.execute(ApiRequest::post(
            self.api.append_url(container, name),
            Some(serde_json::to_value(body)?),
        ))?;
        tracing::debug!(container, name, rows = matrix.len(), "appended rows");
        Ok(())
    }

    /// Fetch every value of a sheet
    pub fn get_values(&self, container: &str, name: &str) -> Result<TabularMatrix, SheetError> {
        let response = self.execute(ApiRequest::get(self.api.values_url(container, name)))?;
        decode_wire_values(&response.body)
    }

    /// Copy a sheet (values and structure) into `destination`
    pub fn duplicate_sheet(
        &self,
        container: &str,
        sheet_id: SheetId,
        destination: &str,
    ) -> Result<SheetIdentity, SheetError> {
        let body = CopySheetRequest {
            destination_spreadsheet_id: destination.to_string(),
        };
        let response = self.execute(ApiRequest::post(
            self.api.copy_to_url(container, sheet_id),
            Some(serde_json::to_value(body)?),
        ))?;

        let properties: SheetProperties = parse_json(&response, "copied sheet properties")?;
        match properties {
            SheetProperties {
                sheet_id: Some(id),
                title: Some(title),
            } => {
                tracing::info!(container, source = %sheet_id, copy = %id, destination, "duplicated sheet");
                Ok(SheetIdentity::new(destination, id, title))
            }
            _ => Err(SheetError::MalformedResponse(
                "copied sheet properties lack sheetId or title".to_string(),
            )),
        }
    }

    /// Fit rows, then columns, to their content.
    ///
    /// Two separate requests: if the column request fails the row resize
    /// stays applied.
    pub fn resize_dimensions_to_fit(
        &self,
        container: &str,
        sheet_id: SheetId,
    ) -> Result<(), SheetError> {
        for dimension in [Dimension::Rows, Dimension::Columns] {
            self.batch_update(
                container,
                vec![StructuralRequest::AutoResizeDimensions(AutoResizeDimensions {
                    dimensions: DimensionRange {
                        sheet_id,
                        dimension,
                    },
                })],
                false,
            )?;
        }
        Ok(())
    }

    /// Change a sheet's title
    pub fn rename_sheet(
        &self,
        container: &str,
        sheet_id: SheetId,
        new_name: &str,
    ) -> Result<(), SheetError> {
        self.update_properties(container, sheet_id, new_name, "title")?;
        tracing::info!(container, sheet_id = %sheet_id, new_name, "renamed sheet");
        Ok(())
    }

    /// Set both id and title in one update.
    ///
    /// Only used by the older swap-in replace flow, where a freshly written
    /// sheet takes over the id and name of the one it replaces. `from_id` is
    /// the sheet being superseded; it must still exist, otherwise nothing is
    /// sent. The update itself addresses `to_id`.
    pub fn rename_and_reassign_id(
        &self,
        container: &str,
        from_id: SheetId,
        to_id: SheetId,
        new_name: &str,
    ) -> Result<(), SheetError> {
        let spreadsheet = self.spreadsheet(container)?;
        if !spreadsheet.sheet_properties().any(|(id, _)| id == from_id) {
            return Err(SheetError::InvalidArgument(format!(
                "sheet #{} to supersede does not exist in spreadsheet '{}'",
                from_id, container
            )));
        }

        tracing::debug!(container, from = %from_id, to = %to_id, new_name, "reassigning sheet id");
        self.update_properties(container, to_id, new_name, "sheetId,title")
    }

    fn update_properties(
        &self,
        container: &str,
        sheet_id: SheetId,
        title: &str,
        fields: &str,
    ) -> Result<(), SheetError> {
        self.batch_update(
            container,
            vec![StructuralRequest::UpdateSheetProperties(UpdateSheetProperties {
                properties: SheetProperties {
                    sheet_id: Some(sheet_id),
                    title: Some(title.to_string()),
                },
                fields: fields.to_string(),
            })],
            false,
        )?;
        Ok(())
    }

    fn batch_update(
        &self,
        container: &str,
        requests: Vec<StructuralRequest>,
        include_spreadsheet_in_response: bool,
    ) -> Result<ApiResponse, SheetError> {
        let body = BatchUpdateRequest {
            requests,
            include_spreadsheet_in_response,
        };
        self.execute(ApiRequest::post(
            self.api.batch_update_url(container),
            Some(serde_json::to_value(body)?),
        ))
    }

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, SheetError> {
        let response = self.transport.send(&request)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            "sheets api call"
        );

        if !response.is_success() {
            return Err(SheetError::RemoteRequestFailed {
                status_code: response.status,
                status_text: response.status_text.clone(),
                body: response.body_text(),
            });
        }
        Ok(response)
    }
}

fn parse_json<T: DeserializeOwned>(response: &ApiResponse, what: &str) -> Result<T, SheetError> {
    serde_json::from_slice(&response.body).map_err(|e| {
        SheetError::MalformedResponse(format!("could not parse {}: {}", what, e))
    })
}
