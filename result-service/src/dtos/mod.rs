pub mod results;

pub use results::{
    bson_to_json, document_to_json, CreateResultResponse, ListResultsResponse, ResultView,
};
