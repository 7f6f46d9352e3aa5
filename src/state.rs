use crate::generator::Generator;

// app's shared state

pub struct AppState {
    pub generator: Generator,
}

impl AppState {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }
}
