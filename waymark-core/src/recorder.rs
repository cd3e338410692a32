//! Invocation recording.
//!
//! A [`Recording`] stands in for a handler: invoking a typed
//! [`HandlerMethod`] on it captures the call instead of running it, and hands
//! back a new stand-in for the method's return type sharing the same session.
//! The binding engine later reads the captured [`MethodInvocation`] to build
//! the URI.
//!
//! ```rust,ignore
//! let recording = method_on::<PersonController>(())
//!     .invoke(PersonController::SHOW, (42,));
//! let link = web_handler.link_to(&recording)?.with_self_rel();
//! ```

use crate::argument::{Argument, IntoArguments};
use crate::handler::{Handler, HandlerDescriptor, HandlerMethod, Inherits, MethodDescriptor};
use crate::{Error, Result};
use lru::LruCache;
use std::any::TypeId;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::rc::Rc;
use tracing::{debug, trace};

/// Default number of stand-ins kept per recorder.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

// ============================================================================
// Method Invocation
// ============================================================================

/// A captured method call.
#[derive(Clone)]
pub struct MethodInvocation {
    target: &'static HandlerDescriptor,
    declaring: &'static HandlerDescriptor,
    method: &'static str,
    arguments: Vec<Argument>,
}

impl MethodInvocation {
    /// The handler the recording was started on.
    pub fn target(&self) -> &'static HandlerDescriptor {
        self.target
    }

    /// The handler whose method was invoked.
    pub fn declaring(&self) -> &'static HandlerDescriptor {
        self.declaring
    }

    pub fn method_name(&self) -> &'static str {
        self.method
    }

    /// The invoked method's metadata.
    pub fn method(&self) -> Result<&'static MethodDescriptor> {
        self.declaring
            .find_method(self.method)
            .ok_or_else(|| Error::UndeclaredMethod {
                handler: self.declaring.name().to_string(),
                method: self.method.to_string(),
            })
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

impl PartialEq for MethodInvocation {
    fn eq(&self, other: &Self) -> bool {
        self.target.type_id() == other.target.type_id()
            && self.declaring.type_id() == other.declaring.type_id()
            && self.method == other.method
            && self.arguments == other.arguments
    }
}

impl Eq for MethodInvocation {}

impl fmt::Debug for MethodInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("target", &self.target.name())
            .field("method", &format_args!("{}::{}", self.declaring.name(), self.method))
            .field("arguments", &self.arguments)
            .finish()
    }
}

// ============================================================================
// Recording Session
// ============================================================================

struct Session {
    target: &'static HandlerDescriptor,
    object_parameters: Vec<Argument>,
    last_invocation: Option<MethodInvocation>,
}

type SharedSession = Rc<RefCell<Session>>;

/// Anything that carries a recorded invocation.
pub trait LastInvocationAware {
    fn last_invocation(&self) -> Option<MethodInvocation>;

    /// Class-level arguments used to fill the type-level mapping.
    fn object_parameters(&self) -> Vec<Argument>;

    /// The handler the recording was started on.
    fn target(&self) -> &'static HandlerDescriptor;
}

/// A stand-in for a value of type `T` produced while recording.
pub struct Recording<T> {
    session: SharedSession,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Recording<T> {
    fn from_session(session: SharedSession) -> Self {
        Self {
            session,
            _marker: PhantomData,
        }
    }

    /// Capture a call of `method` with `arguments`.
    ///
    /// Nothing runs: the returned stand-in shares this session, so chained
    /// sub-resource calls replace the captured invocation.
    pub fn invoke<H, A, R>(&self, method: HandlerMethod<H, A, R>, arguments: A) -> Recording<R>
    where
        H: Handler,
        T: Inherits<H>,
        A: IntoArguments,
    {
        {
            let mut session = self.session.borrow_mut();
            let invocation = MethodInvocation {
                target: session.target,
                declaring: H::descriptor(),
                method: method.name(),
                arguments: arguments.into_arguments(),
            };
            trace!(invocation = ?invocation, "Recorded invocation");
            session.last_invocation = Some(invocation);
        }

        Recording::from_session(Rc::clone(&self.session))
    }

    /// The captured invocation, failing when nothing was invoked yet.
    pub fn require_invocation(&self) -> Result<MethodInvocation> {
        self.last_invocation()
            .ok_or_else(|| Error::NoInvocation(self.target().name().to_string()))
    }

    /// Whether two stand-ins belong to the same recording session.
    pub fn same_session<U>(&self, other: &Recording<U>) -> bool {
        Rc::ptr_eq(&self.session, &other.session)
    }
}

impl<T> LastInvocationAware for Recording<T> {
    fn last_invocation(&self) -> Option<MethodInvocation> {
        self.session.borrow().last_invocation.clone()
    }

    fn object_parameters(&self) -> Vec<Argument> {
        self.session.borrow().object_parameters.clone()
    }

    fn target(&self) -> &'static HandlerDescriptor {
        self.session.borrow().target
    }
}

impl<T> Clone for Recording<T> {
    fn clone(&self) -> Self {
        Self::from_session(Rc::clone(&self.session))
    }
}

impl<T> PartialEq for Recording<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_session(other)
    }
}

impl<T> Eq for Recording<T> {}

impl<T> fmt::Debug for Recording<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.borrow();
        f.debug_struct("Recording")
            .field("target", &session.target.name())
            .field("last_invocation", &session.last_invocation)
            .finish()
    }
}

// ============================================================================
// Recorder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    type_id: TypeId,
    arguments: Vec<Argument>,
}

/// Hands out recording stand-ins, reusing them per `(type, arguments)`.
///
/// The recorder is confined to the thread that created it. A cached stand-in
/// is reset when handed out again, so a recording must be turned into a link
/// before the same call shape is recorded again.
pub struct InvocationRecorder {
    cache: RefCell<LruCache<CacheKey, SharedSession>>,
}

impl InvocationRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Begin recording on handler `T`, with `arguments` filling the variables
    /// of its type-level mapping.
    pub fn on<T: Handler>(&self, arguments: impl IntoArguments) -> Recording<T> {
        let key = CacheKey {
            type_id: TypeId::of::<T>(),
            arguments: arguments.into_arguments(),
        };

        let mut cache = self.cache.borrow_mut();
        if let Some(session) = cache.get(&key) {
            session.borrow_mut().last_invocation = None;
            return Recording::from_session(Rc::clone(session));
        }

        let session = Rc::new(RefCell::new(Session {
            target: T::descriptor(),
            object_parameters: key.arguments.clone(),
            last_invocation: None,
        }));

        if let Some((evicted, _)) = cache.push(key, Rc::clone(&session)) {
            debug!(
                type_id = ?evicted.type_id,
                capacity = cache.cap().get(),
                "Evicted recording stand-in from cache"
            );
        }

        Recording::from_session(session)
    }

    /// Alias of [`on`](Self::on).
    pub fn begin_recording<T: Handler>(&self, arguments: impl IntoArguments) -> Recording<T> {
        self.on::<T>(arguments)
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.borrow().cap().get()
    }
}

impl Default for InvocationRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InvocationRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationRecorder")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

thread_local! {
    static RECORDER: InvocationRecorder = InvocationRecorder::new();
}

/// Begin recording on handler `T` with the current thread's recorder.
pub fn method_on<T: Handler>(arguments: impl IntoArguments) -> Recording<T> {
    RECORDER.with(|recorder| recorder.on::<T>(arguments))
}
