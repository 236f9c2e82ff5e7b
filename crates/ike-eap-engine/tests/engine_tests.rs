//! Dispatcher and re-authentication cache working together

use ike_eap_engine::{
    DispatchOutcome, EapCallback, EapDispatcher, EngineConfig, MessageProcessor, ReauthCache,
    ReauthKey, ReauthStore,
};
use ike_eap_proto::crypto::{Prf, PrfAlgorithm};
use ike_eap_proto::eap::ttls::{FragmentStatus, InboundReassembler, TtlsTypeData};
use ike_eap_proto::{EapMethodInfo, EapResult, EapType, ErrorCause};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

const PERMANENT_ID: &str = "0001010123456789@nai.epc";

/// Fast re-authentication against cached contexts
///
/// A message is the UTF-8 re-authentication identity.
struct FastReauth {
    cache: Arc<ReauthCache>,
    prf: Prf,
}

impl MessageProcessor for FastReauth {
    fn process(&self, message: &[u8]) -> EapResult {
        let reauth_id = match std::str::from_utf8(message) {
            Ok(id) => id,
            Err(_) => return EapResult::Error(ErrorCause::InvalidRequest("identity is not UTF-8".to_string())),
        };

        let Some(info) = self.cache.take_valid(&ReauthKey::new(reauth_id, PERMANENT_ID)) else {
            return EapResult::Failure;
        };

        let counter = info.counter + 1;
        let keys = match self.prf.expand(&info.mk, &counter.to_be_bytes(), 128) {
            Ok(keys) => keys,
            Err(e) => return e.into(),
        };

        let next_id = format!("reauth-{}", counter);
        self.cache.register(&next_id, PERMANENT_ID, counter, info.mk.clone(), info.k_encr.clone(), info.k_aut.clone());

        EapResult::success(
            keys[..64].to_vec(),
            keys[64..].to_vec(),
            Some(EapMethodInfo::new(EapType::Aka).with_reauth_id(next_id.into_bytes())),
        )
    }
}

#[derive(Debug, PartialEq)]
enum Event {
    Success(usize, Option<EapMethodInfo>),
    Fail,
    Error(ErrorCause),
}

struct Recorder(UnboundedSender<Event>);

impl EapCallback for Recorder {
    fn on_success(&self, msk: &[u8], _emsk: &[u8], info: Option<EapMethodInfo>) {
        let _ = self.0.send(Event::Success(msk.len(), info));
    }

    fn on_fail(&self) {
        let _ = self.0.send(Event::Fail);
    }

    fn on_response(&self, _packet: Vec<u8>, _flags: u32) {}

    fn on_error(&self, cause: ErrorCause) {
        let _ = self.0.send(Event::Error(cause));
    }
}

#[tokio::test]
async fn test_fast_reauth_rotates_identity() {
    let config = EngineConfig::default();
    let cache = Arc::new(ReauthCache::new(config.reauth_cache_capacity, config.reauth_ttl()));
    cache.register("reauth-0", PERMANENT_ID, 0, vec![0x11; 20], vec![0x22; 16], vec![0x33; 16]);

    let (tx, mut events) = unbounded_channel();
    let dispatcher = EapDispatcher::new(
        Arc::new(FastReauth {
            cache: Arc::clone(&cache),
            prf: Prf::new(PrfAlgorithm::HmacSha256),
        }),
        Arc::new(Recorder(tx)),
    )
    .unwrap()
    .with_timeout(config.dispatch_timeout())
    .with_logger(config.logger());

    let outcome = dispatcher.process_message(b"reauth-0".to_vec()).unwrap().await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(
        events.recv().await.unwrap(),
        Event::Success(64, Some(EapMethodInfo::new(EapType::Aka).with_reauth_id(b"reauth-1".to_vec())))
    );

    // The old identity was consumed; the new one is usable once
    dispatcher.process_message(b"reauth-0".to_vec()).unwrap().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), Event::Fail);

    dispatcher.process_message(b"reauth-1".to_vec()).unwrap().await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), Event::Success(64, _)));
    assert_eq!(cache.get(&ReauthKey::new("reauth-2", PERMANENT_ID)).unwrap().counter, 2);

    dispatcher.process_message(vec![0xff, 0xfe]).unwrap().await.unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::Error(ErrorCause::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_fragmented_request_reassembled_before_dispatch() {
    // A processor that reassembles TTLS fragments and acknowledges until complete
    struct Reassembling(parking_lot::Mutex<InboundReassembler>);

    impl MessageProcessor for Reassembling {
        fn process(&self, message: &[u8]) -> EapResult {
            let frame = match TtlsTypeData::decode(message) {
                Ok(frame) => frame,
                Err(e) => return e.into(),
            };
            match self.0.lock().assemble(&frame) {
                Ok(FragmentStatus::Ack) => EapResult::response(TtlsTypeData::acknowledgment().encode(), 0),
                Ok(FragmentStatus::Assembled(data)) => EapResult::response(data, 0),
                Err(e) => e.into(),
            }
        }
    }

    struct Responses(UnboundedSender<Vec<u8>>);

    impl EapCallback for Responses {
        fn on_success(&self, _msk: &[u8], _emsk: &[u8], _info: Option<EapMethodInfo>) {}
        fn on_fail(&self) {}
        fn on_response(&self, packet: Vec<u8>, _flags: u32) {
            let _ = self.0.send(packet);
        }
        fn on_error(&self, _cause: ErrorCause) {}
    }

    let (tx, mut responses) = unbounded_channel();
    let dispatcher = EapDispatcher::new(
        Arc::new(Reassembling(parking_lot::Mutex::new(InboundReassembler::new()))),
        Arc::new(Responses(tx)),
    )
    .unwrap();

    let mut fragmenter = EngineConfig {
        ttls_fragment_size: 4,
        ..EngineConfig::default()
    }
    .fragmenter()
    .unwrap();
    fragmenter.setup(b"client hello".to_vec()).unwrap();

    let mut last = Vec::new();
    while fragmenter.has_remaining() {
        let frame = fragmenter.next_frame().unwrap();
        dispatcher.process_message(frame.encode()).unwrap().await.unwrap();
        last = responses.recv().await.unwrap();
    }
    assert_eq!(last, b"client hello".to_vec());
}
