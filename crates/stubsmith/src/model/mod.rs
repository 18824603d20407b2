//! Data model shared by the render pipeline, the journal and the admin API.

mod definition;
mod event;
mod headers;
mod request;
mod response;

pub use definition::{
    DefinitionError, Parameters, ProxyTarget, ResponseBodySpec, ResponseDefinition,
    ResponseSource,
};
pub use event::{LoggedResponse, ServedEvent, StubReference};
pub use headers::{HttpHeader, HttpHeaders};
pub use request::{parse_query_string, LoggedRequest};
pub use response::{Response, ResponseBody, ResponseBuilder};
