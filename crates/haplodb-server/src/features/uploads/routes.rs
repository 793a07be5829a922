//! Upload routes
//!
//! Three multipart endpoints with 202 semantics: the handler reads the form,
//! validates it through the command, registers the job, spawns the pipeline,
//! and returns `{job_id, message}` without waiting for processing.

use crate::api::response::ErrorResponse;
use crate::features::FeatureState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::commands::{
    self, UploadMadcCommand, UploadMadcError, UploadPavCommand, UploadPavError,
    UploadSupplementalCommand, UploadSupplementalError,
};

pub fn upload_routes() -> Router<FeatureState> {
    Router::new()
        .route("/upload", post(upload_madc))
        .route("/pav_upload", post(upload_pav))
        .route("/supplemental_upload", post(upload_supplemental))
}

/// Form fields collected from one multipart request. Which of them must be
/// present depends on the endpoint; the commands enforce that.
#[derive(Debug, Default)]
struct UploadForm {
    file_name: String,
    content_type: Option<String>,
    data: Vec<u8>,
    species: String,
    program_name: String,
    project_name: String,
    description: Option<String>,
}

/// Drain the multipart stream into an [`UploadForm`]. Unknown fields are
/// ignored so frontend additions do not break older servers.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, UploadApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadApiError::Multipart(format!("Failed to read multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                form.file_name = field.file_name().unwrap_or("upload.csv").to_string();
                form.content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    UploadApiError::Multipart(format!("Failed to read file bytes: {e}"))
                })?;
                form.data = bytes.to_vec();
            }
            "species" => form.species = read_text(field).await?,
            "program_name" => form.program_name = read_text(field).await?,
            "project_name" => form.project_name = read_text(field).await?,
            "description" => {
                let text = read_text(field).await?;
                if !text.trim().is_empty() {
                    form.description = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, UploadApiError> {
    field
        .text()
        .await
        .map_err(|e| UploadApiError::Multipart(format!("Failed to read form field: {e}")))
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_madc(
    State(state): State<FeatureState>,
    multipart: Multipart,
) -> Result<Response, UploadApiError> {
    let form = read_form(multipart).await?;
    let command = UploadMadcCommand {
        file_name: form.file_name,
        species: form.species,
        program_name: form.program_name,
        project_name: form.project_name,
        description: form.description,
        data: form.data,
    };

    let accepted = commands::upload_madc::handle(state.db, state.jobs, command).await?;

    tracing::info!(job_id = %accepted.job_id, "MADC upload accepted");
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_pav(
    State(state): State<FeatureState>,
    multipart: Multipart,
) -> Result<Response, UploadApiError> {
    let form = read_form(multipart).await?;
    let command = UploadPavCommand {
        file_name: form.file_name,
        species: form.species,
        program_name: form.program_name,
        content_type: form.content_type,
        data: form.data,
    };

    let accepted = commands::upload_pav::handle(state.db, state.jobs, command).await?;

    tracing::info!(job_id = %accepted.job_id, "PAV upload accepted");
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_supplemental(
    State(state): State<FeatureState>,
    multipart: Multipart,
) -> Result<Response, UploadApiError> {
    let form = read_form(multipart).await?;
    let command = UploadSupplementalCommand {
        file_name: form.file_name,
        species: form.species,
        data: form.data,
    };

    let accepted = commands::upload_supplemental::handle(state.db, state.jobs, command).await?;

    tracing::info!(job_id = %accepted.job_id, "Supplemental upload accepted");
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}

/// Pre-acceptance failures. Everything here is the client's fault and maps
/// to 400; post-acceptance failures surface through job polling instead.
#[derive(Debug)]
enum UploadApiError {
    Multipart(String),
    Madc(UploadMadcError),
    Pav(UploadPavError),
    Supplemental(UploadSupplementalError),
}

impl From<UploadMadcError> for UploadApiError {
    fn from(err: UploadMadcError) -> Self {
        Self::Madc(err)
    }
}

impl From<UploadPavError> for UploadApiError {
    fn from(err: UploadPavError) -> Self {
        Self::Pav(err)
    }
}

impl From<UploadSupplementalError> for UploadApiError {
    fn from(err: UploadSupplementalError) -> Self {
        Self::Supplemental(err)
    }
}

impl std::fmt::Display for UploadApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multipart(msg) => write!(f, "{}", msg),
            Self::Madc(e) => write!(f, "{}", e),
            Self::Pav(e) => write!(f, "{}", e),
            Self::Supplemental(e) => write!(f, "{}", e),
        }
    }
}

impl IntoResponse for UploadApiError {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
        (StatusCode::BAD_REQUEST, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UploadApiError::Madc(UploadMadcError::SpeciesRequired);
        assert!(err.to_string().contains("Species is required"));

        let err = UploadApiError::Pav(UploadPavError::ContentType("text/plain".to_string()));
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn test_routes_structure() {
        let router = upload_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
