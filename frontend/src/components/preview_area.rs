use super::super::Model;
use yew::prelude::*;

pub fn render_preview_area(model: &Model) -> Html {
    let Some(url) = &model.preview_url else {
        return html! {};
    };

    let file_name = model
        .file
        .as_ref()
        .map(|file| file.name())
        .unwrap_or_default();

    html! {
        <div id="preview-container">
            <h2>{"Image Preview:"}</h2>
            <img id="actual-image-preview"
                src={url.to_string()}
                alt={file_name.clone()}
                title={file_name}
                style="max-width:100%; max-height: 400px; object-fit: contain; margin-bottom: 10px;" />
        </div>
    }
}
