mod mock;
mod openai;
mod provider;
mod relay;

pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
pub use provider::{CompletionProvider, TokenStream};
pub use relay::TokenRelay;
