pub mod extract;
pub mod request_id;
pub mod response;

pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use response::{ApiResponse, ApiResult};
