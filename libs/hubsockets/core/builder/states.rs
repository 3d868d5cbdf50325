//! Compile-time markers for the connection builder: `build()` only exists
//! once both the hub endpoint and a credential source were supplied.

use std::marker::PhantomData;

pub trait UrlState {}

pub struct NoUrl;
impl UrlState for NoUrl {}

/// Endpoint supplied
pub struct HasUrl;
impl UrlState for HasUrl {}

pub trait AuthState {}

pub struct NoAuth;
impl AuthState for NoAuth {}

/// Token or auth provider supplied
pub struct HasAuth;
impl AuthState for HasAuth {}

/// Carries both markers inside the builder
#[derive(Debug, Clone, Copy)]
pub struct TypeState<U, A> {
    _url: PhantomData<U>,
    _auth: PhantomData<A>,
}

impl<U, A> TypeState<U, A> {
    pub(crate) fn new() -> Self {
        Self {
            _url: PhantomData,
            _auth: PhantomData,
        }
    }
}

impl<U, A> Default for TypeState<U, A> {
    fn default() -> Self {
        Self::new()
    }
}
