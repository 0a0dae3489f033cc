use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, Error, HttpResponse, Result};
use futures_util::StreamExt;
use log::{debug, error, info, warn};

use crate::classifier::Classifier;
use crate::labels::LabelTable;
use crate::pages;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Shared per-process state. The classifier is `None` when the model
/// failed to load at startup; requests then render the fallback result.
pub struct AppState {
    pub classifier: Option<Classifier>,
    pub labels: LabelTable,
    pub upload_dir: PathBuf,
    pub body_limit: usize,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/", web::post().to(upload));
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(header::ContentType::html())
        .body(pages::form_page())
}

pub async fn upload(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut saved: Option<(PathBuf, String)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field.name() != "file" {
            continue;
        }

        let client_name = field
            .content_disposition()
            .get_filename()
            .unwrap_or("")
            .to_owned();
        if client_name.is_empty() || !allowed_file(&client_name) {
            debug!("rejected upload with filename {client_name:?}");
            return Ok(redirect_to_form());
        }

        let filename = sanitize_filename(&client_name);
        let filepath = state.upload_dir.join(&filename);

        // Whatever interrupts the stream, the partial file must not
        // outlive the request.
        if let Err(e) = save_field(&mut field, &filepath, state.body_limit).await {
            let _ = fs::remove_file(&filepath);
            return Err(e);
        }

        saved = Some((filepath, filename));
        break;
    }

    // No `file` field at all: back to the form, same as a bad extension.
    let Some((filepath, filename)) = saved else {
        debug!("rejected upload without a file field");
        return Ok(redirect_to_form());
    };

    let prediction = {
        let state = state.clone();
        let filepath = filepath.clone();
        web::block(move || match state.classifier.as_ref() {
            Some(classifier) => classifier.predict_file(&filepath).map(Some),
            None => Ok(None),
        })
        .await?
        .unwrap_or_else(|e| {
            error!("inference failed for {filename}: {e}");
            None
        })
    };

    // Uploads are read exactly once, so the file is removed right away.
    if let Err(e) = fs::remove_file(&filepath) {
        warn!("failed to remove upload {}: {e}", filepath.display());
    }

    let labels = &state.labels;
    let page = match prediction {
        Some(prediction) => {
            let full_name = labels.full_name(prediction.label);
            info!(
                "predicted {} ({}%) for {filename}",
                prediction.label,
                pages::format_confidence(prediction.confidence)
            );
            pages::result_page(
                &filename,
                full_name,
                prediction.confidence,
                labels.recommendation(prediction.label),
            )
        }
        None => pages::result_page(&filename, "No result", 0.0, labels.default_recommendation()),
    };

    Ok(HttpResponse::Ok()
        .content_type(header::ContentType::html())
        .body(page))
}

/// Streams one multipart field to `filepath`, enforcing the body limit.
/// Callers remove the file whenever this returns `Err`; the stream may
/// already have created and partially written it.
async fn save_field(
    field: &mut actix_multipart::Field,
    filepath: &Path,
    body_limit: usize,
) -> Result<(), Error> {
    let filepath_for_closure = filepath.to_path_buf();
    let mut f = web::block(move || File::create(&filepath_for_closure))
        .await?
        .map_err(|e| {
            error!("failed to create {}: {e}", filepath.display());
            actix_web::error::ErrorInternalServerError("could not save file")
        })?;

    let mut written = 0usize;
    while let Some(chunk) = field.next().await {
        let data = chunk?;
        written += data.len();
        if written > body_limit {
            debug!(
                "rejected {}: exceeds body limit of {body_limit} bytes",
                filepath.display()
            );
            return Err(actix_web::error::ErrorPayloadTooLarge(
                "upload exceeds body limit",
            ));
        }
        f = web::block(move || f.write_all(&data).map(|_| f))
            .await?
            .map_err(|e| {
                error!("failed to write upload data: {e}");
                actix_web::error::ErrorInternalServerError("could not write to file")
            })?;
    }

    Ok(())
}

fn redirect_to_form() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .finish()
}

/// A file is accepted only by extension: `png`, `jpg`, or `jpeg`,
/// case-insensitive. No content sniffing.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Strips any path components and non-portable characters from the
/// client-supplied filename. Collisions overwrite.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_image_extensions_are_allowed() {
        assert!(allowed_file("lesion.jpg"));
        assert!(allowed_file("lesion.jpeg"));
        assert!(allowed_file("lesion.PNG"));
        assert!(allowed_file("archive.tar.png"));

        assert!(!allowed_file("lesion.gif"));
        assert!(!allowed_file("lesion.jpg.exe"));
        assert!(!allowed_file("lesion"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn sanitized_names_keep_only_portable_characters() {
        assert_eq!(sanitize_filename("lesion.jpg"), "lesion.jpg");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("C:\\temp\\shot.jpg"), "shot.jpg");
    }

    #[test]
    fn degenerate_names_get_a_placeholder() {
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename("///"), "upload");
    }
}
