mod api;
mod components;

use components::header::render_header;
use components::preview_area::render_preview_area;
use components::results::{PredictionRow, render_results, rows_from_response};
use components::upload_section::render_upload_section;
use components::utils::render_status_message;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::PredictResponse;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

// Yew msg components
pub enum Msg {
    FileSelected(GlooFile),
    SetEnsemble(bool),
    Submit,
    PredictionReceived(PredictResponse),
    SetError(String),
}

// Main component
pub struct Model {
    file: Option<GlooFile>,
    preview_url: Option<ObjectUrl>,
    use_ensemble: bool,
    loading: bool,
    message: Option<String>,
    failed: bool,
    predictions: Vec<PredictionRow>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            file: None,
            preview_url: None,
            use_ensemble: false,
            loading: false,
            message: None,
            failed: false,
            predictions: Vec::new(),
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => {
                self.preview_url = Some(ObjectUrl::from(file.clone()));
                self.file = Some(file);
                self.message = None;
                self.failed = false;
                self.predictions.clear();
                true
            }
            Msg::SetEnsemble(use_ensemble) => {
                self.use_ensemble = use_ensemble;
                true
            }
            Msg::Submit => self.handle_submit(ctx),
            Msg::PredictionReceived(response) => {
                self.loading = false;
                self.failed = false;
                self.predictions = rows_from_response(&response);
                self.message = Some("Prediction received".into());
                true
            }
            Msg::SetError(error) => {
                log::error!("{}", error);
                self.loading = false;
                self.failed = true;
                self.message = Some(error);
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                { render_upload_section(self, ctx) }
                { render_preview_area(self) }
                { render_status_message(self) }
                { render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"OsteoScan | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

impl Model {
    fn handle_submit(&mut self, ctx: &Context<Self>) -> bool {
        let Some(file) = self.file.clone() else {
            self.failed = true;
            self.message = Some("Please select a file first.".into());
            return true;
        };

        self.loading = true;
        self.failed = false;
        self.message = None;
        let use_ensemble = self.use_ensemble;
        let link = ctx.link().clone();

        spawn_local(async move {
            let result = match api::upload_image(&file).await {
                Ok(file_path) => api::request_prediction(file_path, use_ensemble).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(response) => link.send_message(Msg::PredictionReceived(response)),
                Err(e) => {
                    log::warn!("Upload or prediction failed: {}", e);
                    link.send_message(Msg::SetError("Failed to upload and predict".into()))
                }
            }
        });

        true
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
