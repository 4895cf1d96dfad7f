//! Prelude module for convenient imports.
//!
//! ```ignore
//! use brx_core::prelude::*;
//! ```

pub use crate::{
    ApiError, ContentType, Error, Form, Method, Part, Request, RequestBody, RequestBuilder,
    Response, Result, Transport, TransportError, from_json, to_json,
};
