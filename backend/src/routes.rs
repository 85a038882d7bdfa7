use actix_files::Files;
use actix_multipart::{Field, Multipart};
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use futures::TryStreamExt;
use log::{error, info, warn};
use shared::{ErrorResponse, MessageResponse, PredictRequest, PredictResponse, UploadResponse};
use std::path::{Path, PathBuf};

use crate::inference::service::InferenceService;
use crate::storage::upload_store::{StorageError, UploadFile, UploadStore};

const UPLOAD_FIELD: &str = "image";

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: PathBuf) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(web::resource("/upload").route(web::post().to(handle_upload)))
        .service(web::resource("/predict").route(web::post().to(handle_predict)))
        .service(Files::new("/", static_dir).index_file("index.html"));
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    warn!("Rejected predict body: {}", err);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        error: err.to_string(),
    });
    InternalError::from_response(err, response).into()
}

fn message(status: actix_web::http::StatusCode, text: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(MessageResponse {
        message: text.into(),
    })
}

/// Advances the multipart body to the first file field named `image` and
/// returns it unread with its client-side file name. Returns `None` when no
/// such field exists.
async fn next_upload_field(payload: &mut Multipart) -> Option<(String, Field)> {
    loop {
        let field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                warn!("Unreadable multipart body: {}", e);
                return None;
            }
        };

        let file_name = field
            .content_disposition()
            .filter(|cd| cd.get_name() == Some(UPLOAD_FIELD))
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        if let Some(file_name) = file_name {
            return Some((file_name, field));
        }
    }
}

/// Writes each chunk to disk as it arrives so the body is never held in memory.
async fn stream_to_file(mut field: Field, mut upload: UploadFile) -> Result<UploadFile, String> {
    while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
        upload = web::block(move || upload.write_chunk(&chunk).map(|_| upload))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?;
    }
    Ok(upload)
}

async fn handle_upload(store: web::Data<UploadStore>, mut payload: Multipart) -> HttpResponse {
    use actix_web::http::StatusCode;

    let Some((file_name, field)) = next_upload_field(&mut payload).await else {
        warn!("Upload rejected: no '{}' file field", UPLOAD_FIELD);
        return message(StatusCode::BAD_REQUEST, "No file part");
    };

    if file_name.is_empty() {
        warn!("Upload rejected: empty file name");
        return message(StatusCode::BAD_REQUEST, "No selected file");
    }

    let upload = match web::block(move || store.open(&file_name)).await {
        Ok(Ok(upload)) => upload,
        Ok(Err(StorageError::InvalidFileName)) => {
            warn!("Upload rejected: file name sanitized to nothing");
            return message(StatusCode::BAD_REQUEST, StorageError::InvalidFileName.to_string());
        }
        Ok(Err(e)) => {
            error!("Failed to store upload: {}", e);
            return message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
        Err(e) => {
            error!("Upload worker failed: {}", e);
            return message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    match stream_to_file(field, upload).await {
        Ok(upload) => {
            info!(
                "Stored upload at {} ({} bytes)",
                upload.path().display(),
                upload.written()
            );
            HttpResponse::Ok().json(UploadResponse {
                file_path: upload.path().display().to_string(),
            })
        }
        Err(e) => {
            error!("Failed to store upload: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn handle_predict(
    service: web::Data<InferenceService>,
    body: web::Json<PredictRequest>,
) -> HttpResponse {
    let PredictRequest {
        file_path,
        use_ensemble,
    } = body.into_inner();

    let Some(file_path) = file_path else {
        warn!("Predict rejected: no file path");
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "No file path provided".into(),
        });
    };

    info!("Predicting {} (ensemble: {})", file_path, use_ensemble);
    let result = web::block(move || service.predict_file(Path::new(&file_path), use_ensemble)).await;

    match result {
        Ok(Ok(models)) => HttpResponse::Ok().json(PredictResponse { models }),
        Ok(Err(e)) => {
            error!("Prediction failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
        Err(e) => {
            error!("Prediction worker failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}
