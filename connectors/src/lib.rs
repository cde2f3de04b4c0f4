//! Tether connector templates.
//!
//! One module per authentication scheme, each a complete connector: it
//! declares its parameter contract, builds an auth provider from the
//! connection parameters, calls its upstream API, and returns the uniform
//! `{"STATUS": n, <payload>}` response object.
//!
//! | Module             | Auth scheme                     | Skill              |
//! |--------------------|---------------------------------|--------------------|
//! | [`splunk`]         | delegated basic + remote job    | `execute_query`    |
//! | [`recorded_future`]| static API key                  | `list_alerts`      |
//! | [`bamboo_hr`]      | Base64 basic (key as username)  | `get_user_details` |
//! | [`msgraph`]        | OAuth2 client credentials       | `list_user_details`|

pub mod bamboo_hr;
pub mod msgraph;
pub mod recorded_future;
pub mod splunk;
