//! 业务服务层

pub mod geoip;
mod link_service;

pub use geoip::{GeoIpLookup, GeoResolver};
pub use link_service::LinkService;
