//! Typed REST gateway for the calendar and meeting APIs.
//!
//! [`RestGateway`] does transport and authentication; [`CalendarApi`] and
//! [`MeetApi`] validate arguments and map operations onto requests.

pub mod calendar;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod meet;
pub mod meta;
pub mod names;
pub mod page;
pub mod request;

pub use {
    calendar::{CalendarApi, Event, EventDateTime, EventPatch, EventQuery, NewEvent},
    endpoints::Endpoints,
    error::{Error, Result},
    gateway::{Gateway, RestGateway},
    meet::{MeetApi, PageRequest, SpaceConfig},
    meta::ResponseMeta,
    page::ListPage,
    request::{ApiTier, GatewayRequest, GatewayResponse, Provider, ResponseBody},
};
