//! Name grammar round-trips.

use ldaptx_codec::{Dn, Rdn};
use ldaptx_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn format_then_parse_is_identity(dn in dn_strategy(5)) {
        let text = dn.to_string();
        let parsed = Dn::parse(&text).unwrap();
        prop_assert_eq!(&parsed, &dn);
        prop_assert_eq!(parsed.len(), dn.len());
    }

    #[test]
    fn formatting_is_stable(dn in dn_strategy(5)) {
        let once = Dn::parse(&dn.to_string()).unwrap().to_string();
        let twice = Dn::parse(&once).unwrap().to_string();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn type_case_does_not_matter(dn in dn_strategy(4)) {
        let upper = Dn::from_rdns(
            dn.rdns()
                .iter()
                .map(|rdn| {
                    let avas = rdn
                        .avas()
                        .iter()
                        .map(|ava| match ava.value().as_text() {
                            Some(text) => ldaptx_codec::Ava::new(ava.attr_type().to_ascii_uppercase(), text),
                            None => ldaptx_codec::Ava::binary(
                                ava.attr_type().to_ascii_uppercase(),
                                ava.value().as_bytes().to_vec(),
                            ),
                        })
                        .collect();
                    Rdn::from_avas(avas).unwrap()
                })
                .collect(),
        );
        prop_assert_eq!(upper.normalized(), dn.normalized());
        prop_assert_eq!(upper, dn);
    }
}

#[test]
fn multi_valued_component() {
    let text = "OU=Sales+CN=J. Smith,O=Widget Inc.,C=US";
    let dn = Dn::parse(text).unwrap();
    assert_eq!(dn.len(), 3);
    let first = &dn.rdns()[0];
    assert_eq!(first.avas().len(), 2);
    assert_eq!(first.avas()[0].attr_type(), "OU");
    assert_eq!(first.avas()[0].text_value(), Some("Sales"));
    assert_eq!(first.avas()[1].attr_type(), "CN");
    assert_eq!(first.avas()[1].text_value(), Some("J. Smith"));
    assert_eq!(dn.to_string(), text);
}

#[test]
fn component_order_within_rdn_is_irrelevant() {
    assert_eq!(
        Dn::parse("cn=J. Smith+ou=Sales,o=Widget").unwrap(),
        Dn::parse("OU=Sales+CN=J. Smith,O=Widget").unwrap()
    );
}

#[test]
fn malformed_names_are_rejected() {
    for text in ["cn", "cn=a,", "=a", "cn=\"open", "cn=#zz", "cn=a\\q"] {
        assert!(Dn::parse(text).is_err(), "{text} should not parse");
    }
}
