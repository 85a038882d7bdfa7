use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-x-ray"></i> {" Upload an Image for Prediction"}</h1>
            <p class="subtitle">{"Knee radiograph screening for osteopenia and osteoporosis"}</p>
        </header>
    }
}
