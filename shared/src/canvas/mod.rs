//! The external pixel canvas, as seen by the coordinator and the workers.
//!
//! Only three capabilities are used: the canvas bounds, the current draw budget in points
//! per second, and drawing one point. [`http::HttpCanvas`] talks to the real service;
//! tests provide in-memory implementations.

pub mod http;

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::models::point::Point;

pub type CanvasResult<T> = Result<T, CanvasError>;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("canvas answered {status} on {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("canvas returned an unusable value on {endpoint}: {value}")]
    InvalidValue { endpoint: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub x: u32,
    pub y: u32,
}

pub trait Canvas: Send + Sync {
    fn get_canvas_size(&self) -> impl Future<Output = CanvasResult<CanvasSize>> + Send;

    /// Current draw budget in points per second.
    fn get_rate_limit(&self) -> impl Future<Output = CanvasResult<f64>> + Send;

    fn put_pixel(&self, point: Point) -> impl Future<Output = CanvasResult<()>> + Send;
}

impl<C: Canvas> Canvas for Arc<C> {
    fn get_canvas_size(&self) -> impl Future<Output = CanvasResult<CanvasSize>> + Send {
        (**self).get_canvas_size()
    }

    fn get_rate_limit(&self) -> impl Future<Output = CanvasResult<f64>> + Send {
        (**self).get_rate_limit()
    }

    fn put_pixel(&self, point: Point) -> impl Future<Output = CanvasResult<()>> + Send {
        (**self).put_pixel(point)
    }
}
