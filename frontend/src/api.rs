use gloo_file::File as GlooFile;
use gloo_net::http::Request;
use shared::{ErrorResponse, MessageResponse, PredictRequest, PredictResponse, UploadResponse};

/// Sends the file as the `image` field and returns the server-side path.
pub async fn upload_image(file: &GlooFile) -> Result<String, String> {
    let form_data =
        web_sys::FormData::new().map_err(|_| "Failed to build upload form.".to_string())?;
    form_data
        .append_with_blob_and_filename("image", file.as_ref(), &file.name())
        .map_err(|_| "Failed to attach file.".to_string())?;

    let response = Request::post("/upload")
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if response.ok() {
        response
            .json::<UploadResponse>()
            .await
            .map(|body| body.file_path)
            .map_err(|e| format!("Failed to parse response: {}", e))
    } else {
        let status = response.status();
        let detail = response
            .json::<MessageResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        Err(format!("Upload failed: {} - {}", status, detail))
    }
}

pub async fn request_prediction(
    file_path: String,
    use_ensemble: bool,
) -> Result<PredictResponse, String> {
    let body = PredictRequest {
        file_path: Some(file_path),
        use_ensemble,
    };

    let response = Request::post("/predict")
        .json(&body)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if response.ok() {
        response
            .json::<PredictResponse>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    } else {
        let status = response.status();
        let detail = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_default();
        Err(format!("Prediction failed: {} - {}", status, detail))
    }
}
