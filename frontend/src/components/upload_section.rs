use super::super::{Model, Msg};
use super::utils::{debounce, first_image_file};
use web_sys::HtmlInputElement;
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();

    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        match input.files().as_ref().and_then(first_image_file) {
            Some(file) => Msg::FileSelected(file),
            None => Msg::SetError("No valid image file selected.".into()),
        }
    });

    let handle_toggle = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::SetEnsemble(input.checked())
    });

    html! {
        <form class="upload-section">
            <input
                type="file"
                id="file-input"
                accept="image/*"
                class="file-input"
                onchange={handle_change}
            />
            <label class="ensemble-toggle">
                <input
                    type="checkbox"
                    id="use-ensemble"
                    checked={model.use_ensemble}
                    onchange={handle_toggle}
                />
                <span>{" Use Evolutionary Ensemble"}</span>
            </label>
            <button
                type="submit"
                class="analyze-btn"
                disabled={model.loading}
                onclick={debounce(300, {
                    let link = link.clone();
                    move || link.send_message(Msg::Submit)
                })}
            >
                {
                    if model.loading {
                        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Predicting..."}</> }
                    } else {
                        html! { "Submit" }
                    }
                }
            </button>
        </form>
    }
}
