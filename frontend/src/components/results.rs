use super::super::Model;
use shared::{ClassLabel, PredictResponse, argmax, class_name};
use yew::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct PredictionRow {
    pub label: String,
    pub predicted_class: String,
    pub probabilities: Vec<f32>,
    pub winning_class: String,
}

/// Numbers model rows from 1; the ensemble record keeps its own name and
/// reports the server's winning class.
pub fn rows_from_response(response: &PredictResponse) -> Vec<PredictionRow> {
    let mut model_number = 0;
    response
        .models
        .iter()
        .map(|record| {
            let (label, winning_class) = match &record.winning_class {
                Some(winner) if record.is_ensemble() => (record.predicted_class.clone(), winner.clone()),
                _ => {
                    model_number += 1;
                    let winner = if record.probabilities.is_empty() {
                        "N/A".to_string()
                    } else {
                        class_name(argmax(&record.probabilities))
                    };
                    (format!("Model {}", model_number), winner)
                }
            };
            PredictionRow {
                label,
                predicted_class: record.predicted_class.clone(),
                probabilities: record.probabilities.clone(),
                winning_class,
            }
        })
        .collect()
}

fn render_probabilities(probabilities: &[f32]) -> Html {
    html! {
        <ul class="list-unstyled">
            { for ClassLabel::names().into_iter().enumerate().map(|(i, name)| {
                let value = probabilities
                    .get(i)
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "N/A".to_string());
                html! { <li><strong>{ format!("{}:", name) }</strong>{ format!(" {}", value) }</li> }
            })}
        </ul>
    }
}

pub fn render_results(model: &Model) -> Html {
    if model.predictions.is_empty() {
        return html! {};
    }

    html! {
        <div class="results-container">
            <h2>{"Predictions:"}</h2>
            <table class="table table-bordered table-hover">
                <thead>
                    <tr>
                        <th>{"Model"}</th>
                        <th>{"Predicted Class"}</th>
                        <th>{"Probabilities"}</th>
                        <th>{"Winning Class"}</th>
                    </tr>
                </thead>
                <tbody>
                    { for model.predictions.iter().map(|row| html! {
                        <tr key={row.label.clone()}>
                            <td>{ &row.label }</td>
                            <td>{ &row.predicted_class }</td>
                            <td>{ render_probabilities(&row.probabilities) }</td>
                            <td>{ &row.winning_class }</td>
                        </tr>
                    })}
                </tbody>
            </table>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ModelPrediction;

    fn record(class: &str, probabilities: [f32; 3], winner: Option<&str>) -> ModelPrediction {
        ModelPrediction {
            predicted_class: class.to_string(),
            probabilities: probabilities.to_vec(),
            winning_class: winner.map(str::to_string),
        }
    }

    #[test]
    fn numbers_models_and_keeps_ensemble_winner() {
        let response = PredictResponse {
            models: vec![
                record("Healthy", [0.6, 0.3, 0.1], None),
                record("Osteoporosis", [0.1, 0.2, 0.7], None),
                record("Ensemble", [0.35, 0.25, 0.4], Some("Osteoporosis")),
            ],
        };

        let rows = rows_from_response(&response);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "Model 1");
        assert_eq!(rows[0].winning_class, "Healthy");
        assert_eq!(rows[1].label, "Model 2");
        assert_eq!(rows[2].label, "Ensemble");
        assert_eq!(rows[2].winning_class, "Osteoporosis");
    }

    #[test]
    fn empty_probabilities_have_no_winner() {
        let response = PredictResponse {
            models: vec![ModelPrediction {
                predicted_class: "Healthy".into(),
                probabilities: vec![],
                winning_class: None,
            }],
        };
        assert_eq!(rows_from_response(&response)[0].winning_class, "N/A");
    }

    #[test]
    fn ties_go_to_the_first_class() {
        let response = PredictResponse {
            models: vec![
                record("Healthy", [0.4, 0.4, 0.2], None),
                record("Ensemble", [0.4, 0.4, 0.2], Some("Healthy")),
            ],
        };
        let rows = rows_from_response(&response);
        assert_eq!(rows[0].winning_class, "Healthy");
        assert_eq!(rows[0].winning_class, rows[0].predicted_class);
        assert_eq!(rows[1].winning_class, "Healthy");
    }
}
