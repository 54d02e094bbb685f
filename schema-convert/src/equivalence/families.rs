//! Built-in predicate families.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use value_tree_core::{Fields, Scalar, Value};

use crate::equivalence::predicate::{
    no_argument, required_argument, EquivalenceContext, EquivalencePredicate, PredicateError,
    PredicateFactory,
};
use crate::identity::{IdentityResolver, SelfLinkResolver};

type Built = Result<Arc<dyn EquivalencePredicate>, PredicateError>;

fn unexpected(predicate: &str, expected: &str, found: &Value) -> PredicateError {
    PredicateError::UnexpectedType {
        predicate: predicate.to_string(),
        expected: expected.to_string(),
        found: found.kind_name().to_string(),
    }
}

fn malformed(predicate: &str, value: &str) -> PredicateError {
    PredicateError::Malformed {
        predicate: predicate.to_string(),
        value: value.to_string(),
    }
}

fn string_of<'a>(
    predicate: &str,
    value: Option<&'a Value>,
) -> Result<Option<&'a str>, PredicateError> {
    match value {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| unexpected(predicate, "string", v)),
    }
}

fn both_strings<'a>(
    predicate: &str,
    old: Option<&'a Value>,
    new: Option<&'a Value>,
) -> Result<Option<(&'a str, &'a str)>, PredicateError> {
    Ok(match (string_of(predicate, old)?, string_of(predicate, new)?) {
        (Some(o), Some(n)) => Some((o, n)),
        _ => None,
    })
}

fn invalid_argument(family: &str, argument: &str, message: &str) -> PredicateError {
    PredicateError::InvalidArgument {
        family: family.to_string(),
        argument: argument.to_string(),
        message: message.to_string(),
    }
}

/// `"1:00"` ≡ `"01:00"`.
#[derive(Debug)]
pub struct Rfc3339Time;

impl EquivalencePredicate for Rfc3339Time {
    fn name(&self) -> &str {
        "rfc3339_time"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        Ok((o.len() == 4 && format!("0{o}") == n) || (n.len() == 4 && format!("0{n}") == o))
    }
}

fn build_rfc3339_time(argument: Option<&str>) -> Built {
    no_argument("rfc3339_time", argument)?;
    Ok(Arc::new(Rfc3339Time))
}

inventory::submit! {
    PredicateFactory {
        family: "rfc3339_time",
        summary: "clock times equal up to a missing leading zero (1:00 = 01:00)",
        build: build_rfc3339_time,
    }
}

/// Absent or empty string ≡ a fixed sentinel.
#[derive(Debug)]
pub struct EmptyOrDefault {
    sentinel: String,
}

impl EmptyOrDefault {
    fn normalise<'a>(&'a self, value: Option<&'a str>) -> &'a str {
        match value {
            None | Some("") => &self.sentinel,
            Some(s) => s,
        }
    }
}

impl EquivalencePredicate for EmptyOrDefault {
    fn name(&self) -> &str {
        "empty_or_default"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let o = string_of(self.name(), old)?;
        let n = string_of(self.name(), new)?;
        Ok(self.normalise(o) == self.normalise(n))
    }
}

fn build_empty_or_default(argument: Option<&str>) -> Built {
    let sentinel = required_argument("empty_or_default", argument)?;
    Ok(Arc::new(EmptyOrDefault {
        sentinel: sentinel.to_string(),
    }))
}

inventory::submit! {
    PredicateFactory {
        family: "empty_or_default",
        summary: "absent or empty string equals the given sentinel (empty_or_default:SENTINEL)",
        build: build_empty_or_default,
    }
}

/// Absent or empty string ≡ any `*_UNSPECIFIED` enum value.
#[derive(Debug)]
pub struct UnspecifiedEnum;

fn unspecified(value: Option<&str>) -> Option<&str> {
    match value {
        None | Some("") => None,
        Some(s) if s.ends_with("_UNSPECIFIED") => None,
        Some(s) => Some(s),
    }
}

impl EquivalencePredicate for UnspecifiedEnum {
    fn name(&self) -> &str {
        "unspecified_enum"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let o = string_of(self.name(), old)?;
        let n = string_of(self.name(), new)?;
        Ok(unspecified(o) == unspecified(n))
    }
}

fn build_unspecified_enum(argument: Option<&str>) -> Built {
    no_argument("unspecified_enum", argument)?;
    Ok(Arc::new(UnspecifiedEnum))
}

inventory::submit! {
    PredicateFactory {
        family: "unspecified_enum",
        summary: "absent or empty string equals an explicit *_UNSPECIFIED enum value",
        build: build_unspecified_enum,
    }
}

/// One-way feature flag: once `true`, a later `false` is not a change.
///
/// Only the `true -> false` transition is suppressed; an absent value on
/// either side never is.
#[derive(Debug)]
pub struct HasBeenEnabled;

impl EquivalencePredicate for HasBeenEnabled {
    fn name(&self) -> &str {
        "has_been_enabled"
    }

    fn symmetric(&self) -> bool {
        false
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let (Some(old), Some(new)) = (old, new) else {
            return Ok(false);
        };
        let o = old.as_bool().ok_or_else(|| unexpected(self.name(), "bool", old))?;
        let n = new.as_bool().ok_or_else(|| unexpected(self.name(), "bool", new))?;
        Ok(o && !n)
    }
}

fn build_has_been_enabled(argument: Option<&str>) -> Built {
    no_argument("has_been_enabled", argument)?;
    Ok(Arc::new(HasBeenEnabled))
}

inventory::submit! {
    PredicateFactory {
        family: "has_been_enabled",
        summary: "one-way flag: old true and new false are treated as the same (asymmetric)",
        build: build_has_been_enabled,
    }
}

/// A repeated block ≡ its absence when one side is empty and every element
/// on the other side holds only zero values.
#[derive(Debug)]
pub struct EmptyBlock;

fn block_items<'a>(
    predicate: &str,
    value: Option<&'a Value>,
) -> Result<Vec<&'a Value>, PredicateError> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::List(items)) | Some(Value::Set(items)) => Ok(items.iter().collect()),
        Some(v @ Value::Object(_)) | Some(v @ Value::Map(_)) => Ok(vec![v]),
        Some(other) => Err(unexpected(predicate, "block", other)),
    }
}

fn defaultable(element: &Value) -> bool {
    match element {
        Value::Object(fields) | Value::Map(fields) => fields.values().all(Value::is_zero),
        other => other.is_zero(),
    }
}

impl EquivalencePredicate for EmptyBlock {
    fn name(&self) -> &str {
        "empty_block"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let o = block_items(self.name(), old)?;
        let n = block_items(self.name(), new)?;
        Ok((o.is_empty() && n.iter().all(|e| defaultable(e)))
            || (n.is_empty() && o.iter().all(|e| defaultable(e))))
    }
}

fn build_empty_block(argument: Option<&str>) -> Built {
    no_argument("empty_block", argument)?;
    Ok(Arc::new(EmptyBlock))
}

inventory::submit! {
    PredicateFactory {
        family: "empty_block",
        summary: "an empty or absent block equals a block whose fields are all zero",
        build: build_empty_block,
    }
}

/// Self link ≡ relative name ≡ short name of the same resource.
#[derive(Debug)]
pub struct SelfLinkOrName;

impl EquivalencePredicate for SelfLinkOrName {
    fn name(&self) -> &str {
        "self_link_or_name"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        Ok(SelfLinkResolver.same_resource(o, n))
    }
}

fn build_self_link_or_name(argument: Option<&str>) -> Built {
    no_argument("self_link_or_name", argument)?;
    Ok(Arc::new(SelfLinkOrName))
}

inventory::submit! {
    PredicateFactory {
        family: "self_link_or_name",
        summary: "self link, relative name and short name of one resource are the same",
        build: build_self_link_or_name,
    }
}

#[derive(Debug)]
pub struct CaseInsensitive;

impl EquivalencePredicate for CaseInsensitive {
    fn name(&self) -> &str {
        "case_insensitive"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        Ok(o.to_lowercase() == n.to_lowercase())
    }
}

fn build_case_insensitive(argument: Option<&str>) -> Built {
    no_argument("case_insensitive", argument)?;
    Ok(Arc::new(CaseInsensitive))
}

inventory::submit! {
    PredicateFactory {
        family: "case_insensitive",
        summary: "strings equal ignoring case",
        build: build_case_insensitive,
    }
}

/// Durations such as `60s`, `60.0s` or `1m` compared by length.
#[derive(Debug)]
pub struct Duration;

/// Parse a duration (`1h30m`, `60.0s`, `250ms`) into seconds.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let mut rest = raw.trim();
    let negative = rest.starts_with('-');
    rest = rest.trim_start_matches(['-', '+']);
    if rest == "0" {
        return Some(0.0);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total = 0.0;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let number: f64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += number * scale;
    }
    Some(if negative { -total } else { total })
}

impl EquivalencePredicate for Duration {
    fn name(&self) -> &str {
        "duration"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        let o = parse_duration(o).ok_or_else(|| malformed(self.name(), o))?;
        let n = parse_duration(n).ok_or_else(|| malformed(self.name(), n))?;
        Ok((o - n).abs() < 1e-9)
    }
}

fn build_duration(argument: Option<&str>) -> Built {
    no_argument("duration", argument)?;
    Ok(Arc::new(Duration))
}

inventory::submit! {
    PredicateFactory {
        family: "duration",
        summary: "durations equal by length (60.0s = 60s = 1m)",
        build: build_duration,
    }
}

/// URLs equal up to one trailing slash.
#[derive(Debug)]
pub struct TrailingSlash;

impl EquivalencePredicate for TrailingSlash {
    fn name(&self) -> &str {
        "trailing_slash"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        Ok(o.strip_suffix('/').unwrap_or(o) == n.strip_suffix('/').unwrap_or(n))
    }
}

fn build_trailing_slash(argument: Option<&str>) -> Built {
    no_argument("trailing_slash", argument)?;
    Ok(Arc::new(TrailingSlash))
}

inventory::submit! {
    PredicateFactory {
        family: "trailing_slash",
        summary: "strings equal up to one trailing slash",
        build: build_trailing_slash,
    }
}

/// Numbers equal across int, float and numeric-string renderings.
#[derive(Debug)]
pub struct Numeric;

fn number_of(predicate: &str, value: &Value) -> Result<f64, PredicateError> {
    match value {
        Value::Scalar(Scalar::Int(i)) => Ok(*i as f64),
        Value::Scalar(Scalar::Float(f)) => Ok(*f),
        Value::Scalar(Scalar::String(s)) => s.trim().parse().map_err(|_| malformed(predicate, s)),
        other => Err(unexpected(predicate, "number", other)),
    }
}

impl EquivalencePredicate for Numeric {
    fn name(&self) -> &str {
        "numeric"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let (Some(old), Some(new)) = (old, new) else {
            return Ok(false);
        };
        let o = number_of(self.name(), old)?;
        let n = number_of(self.name(), new)?;
        let scale = o.abs().max(n.abs()).max(1.0);
        Ok((o - n).abs() <= f64::EPSILON * scale)
    }
}

fn build_numeric(argument: Option<&str>) -> Built {
    no_argument("numeric", argument)?;
    Ok(Arc::new(Numeric))
}

inventory::submit! {
    PredicateFactory {
        family: "numeric",
        summary: "numbers equal across int, float and string forms (3 = 3.0 = \"3\")",
        build: build_numeric,
    }
}

/// Enum values equal after mapping aliases onto their canonical names.
#[derive(Debug)]
pub struct EnumAlias {
    aliases: BTreeMap<String, String>,
}

impl EnumAlias {
    fn canonical<'a>(&'a self, value: &'a str) -> &'a str {
        self.aliases.get(value).map(String::as_str).unwrap_or(value)
    }
}

impl EquivalencePredicate for EnumAlias {
    fn name(&self) -> &str {
        "enum_alias"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        Ok(self.canonical(o) == self.canonical(n))
    }
}

fn build_enum_alias(argument: Option<&str>) -> Built {
    let raw = required_argument("enum_alias", argument)?;
    let mut aliases = BTreeMap::new();
    for pair in raw.split(',') {
        let Some((alias, canonical)) = pair.split_once('=') else {
            return Err(invalid_argument("enum_alias", raw, "expected ALIAS=CANONICAL pairs"));
        };
        let (alias, canonical) = (alias.trim(), canonical.trim());
        if alias.is_empty() || canonical.is_empty() {
            return Err(invalid_argument("enum_alias", raw, "empty alias or canonical name"));
        }
        aliases.insert(alias.to_string(), canonical.to_string());
    }
    Ok(Arc::new(EnumAlias { aliases }))
}

inventory::submit! {
    PredicateFactory {
        family: "enum_alias",
        summary: "enum values equal after alias mapping (enum_alias:OLD=NEW,A=B)",
        build: build_enum_alias,
    }
}

/// A block disabled on the old side ≡ the block missing on the new side.
///
/// One-way: an old absent block never matches a new disabled one. With an
/// argument, the named key of the block must also be unchanged.
#[derive(Debug)]
pub struct DisabledBlock {
    unchanged: Option<String>,
}

fn block_is_absent(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::List(items)) | Some(Value::Set(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Fields of a single-element block, or of a bare object.
fn block_fields(value: Option<&Value>) -> Option<&Fields> {
    match value? {
        Value::List(items) | Value::Set(items) => items.first()?.as_fields(),
        other => other.as_fields(),
    }
}

fn block_is_disabled(predicate: &str, value: Option<&Value>) -> Result<bool, PredicateError> {
    let fields = match value {
        None => return Ok(true),
        Some(Value::List(items)) | Some(Value::Set(items)) => match items.as_slice() {
            [] => return Ok(true),
            [single] => single.as_fields(),
            _ => return Ok(false),
        },
        Some(other) => other.as_fields(),
    };
    let Some(fields) = fields else {
        return Err(PredicateError::UnexpectedType {
            predicate: predicate.to_string(),
            expected: "block".to_string(),
            found: value.map(Value::kind_name).unwrap_or("absent").to_string(),
        });
    };
    match fields.get("enabled") {
        None => Ok(true),
        Some(flag) => flag
            .as_bool()
            .map(|enabled| !enabled)
            .ok_or_else(|| unexpected(predicate, "bool", flag)),
    }
}

/// A key of a block, with zero values read as unset.
fn block_key<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    block_fields(value)?.get(key).filter(|v| !v.is_zero())
}

impl EquivalencePredicate for DisabledBlock {
    fn name(&self) -> &str {
        "disabled_block"
    }

    fn symmetric(&self) -> bool {
        false
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        if block_is_absent(old) || !block_is_absent(new) {
            return Ok(false);
        }
        if let Some(key) = &self.unchanged {
            if block_key(old, key) != block_key(new, key) {
                return Ok(false);
            }
        }
        block_is_disabled(self.name(), old)
    }
}

fn build_disabled_block(argument: Option<&str>) -> Built {
    let unchanged = match argument {
        None => None,
        Some(key) if key.is_empty() => {
            return Err(invalid_argument("disabled_block", key, "empty key name"));
        }
        Some(key) => Some(key.to_string()),
    };
    Ok(Arc::new(DisabledBlock { unchanged }))
}

inventory::submit! {
    PredicateFactory {
        family: "disabled_block",
        summary: "old disabled block equals a missing new block (disabled_block[:KEY], asymmetric)",
        build: build_disabled_block,
    }
}

/// `"/14"` ≡ any CIDR block with a `/14` prefix length.
#[derive(Debug)]
pub struct CidrOrSize;

impl EquivalencePredicate for CidrOrSize {
    fn name(&self) -> &str {
        "cidr_or_size"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        let sized = |size: &str, cidr: &str| size.starts_with('/') && cidr.ends_with(size);
        Ok(sized(o, n) || sized(n, o))
    }
}

fn build_cidr_or_size(argument: Option<&str>) -> Built {
    no_argument("cidr_or_size", argument)?;
    Ok(Arc::new(CidrOrSize))
}

inventory::submit! {
    PredicateFactory {
        family: "cidr_or_size",
        summary: "a bare prefix size equals any CIDR block of that size (/14 = 10.4.0.0/14)",
        build: build_cidr_or_size,
    }
}

/// Scope sets equal once the service adds one implicit scope.
#[derive(Debug)]
pub struct AddedScopes {
    scope: String,
}

fn string_set<'a>(
    predicate: &str,
    value: Option<&'a Value>,
) -> Result<BTreeSet<&'a str>, PredicateError> {
    let Some(value) = value else {
        return Ok(BTreeSet::new());
    };
    let items = value.as_items().ok_or_else(|| unexpected(predicate, "set", value))?;
    items
        .iter()
        .map(|item| item.as_str().ok_or_else(|| unexpected(predicate, "string", item)))
        .collect()
}

impl EquivalencePredicate for AddedScopes {
    fn name(&self) -> &str {
        "added_scopes"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let o = string_set(self.name(), old)?;
        let n = string_set(self.name(), new)?;
        let with_scope = |mut scopes: BTreeSet<_>| {
            scopes.insert(self.scope.as_str());
            scopes
        };
        Ok(with_scope(o.clone()) == n || with_scope(n.clone()) == o)
    }
}

fn build_added_scopes(argument: Option<&str>) -> Built {
    let scope = required_argument("added_scopes", argument)?;
    Ok(Arc::new(AddedScopes {
        scope: scope.to_string(),
    }))
}

inventory::submit! {
    PredicateFactory {
        family: "added_scopes",
        summary: "scope sets equal up to one scope the service adds (added_scopes:SCOPE)",
        build: build_added_scopes,
    }
}

/// Differences are ignored while the resource runs in autopilot mode.
///
/// With an argument, a block that sets the named key on either side is
/// still compared.
#[derive(Debug)]
pub struct Autopilot {
    exempt: Option<String>,
}

const AUTOPILOT_TOGGLE: &str = "enable_autopilot";

impl EquivalencePredicate for Autopilot {
    fn name(&self) -> &str {
        "autopilot"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let enabled = match ctx.get(AUTOPILOT_TOGGLE) {
            None => false,
            Some(flag) => flag.as_bool().ok_or_else(|| unexpected(self.name(), "bool", flag))?,
        };
        if !enabled {
            return Ok(false);
        }
        Ok(match &self.exempt {
            Some(key) => block_key(old, key).is_none() && block_key(new, key).is_none(),
            None => true,
        })
    }
}

fn build_autopilot(argument: Option<&str>) -> Built {
    let exempt = match argument {
        None => None,
        Some(key) if key.is_empty() => {
            return Err(invalid_argument("autopilot", key, "empty key name"));
        }
        Some(key) => Some(key.to_string()),
    };
    Ok(Arc::new(Autopilot { exempt }))
}

inventory::submit! {
    PredicateFactory {
        family: "autopilot",
        summary: "ignore differences while enable_autopilot is true (autopilot[:EXEMPT_KEY])",
        build: build_autopilot,
    }
}

/// Which part of a private cluster block a [`PrivateClusterConfig`] guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrivateClusterPart {
    Block,
    Endpoint,
    Nodes,
    Subnetwork,
}

/// Private cluster settings that are off on both sides ≡ unset.
///
/// A private endpoint subnetwork or global access setting keeps the
/// flags meaningful. The subnetwork itself may be dropped by the service
/// when a master CIDR block is configured.
#[derive(Debug)]
pub struct PrivateClusterConfig {
    part: PrivateClusterPart,
}

const PRIVATE_ENDPOINT: &str = "enable_private_endpoint";
const PRIVATE_NODES: &str = "enable_private_nodes";
const ENDPOINT_SUBNETWORK: &str = "private_endpoint_subnetwork";
const GLOBAL_ACCESS: &str = "master_global_access_config";
const MASTER_CIDR: &str = "master_ipv4_cidr_block";

fn flag_off(predicate: &str, value: Option<&Value>) -> Result<bool, PredicateError> {
    match value {
        None => Ok(true),
        Some(flag) => flag
            .as_bool()
            .map(|on| !on)
            .ok_or_else(|| unexpected(predicate, "bool", flag)),
    }
}

fn is_set(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_zero())
}

impl EquivalencePredicate for PrivateClusterConfig {
    fn name(&self) -> &str {
        "private_cluster_config"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let name = self.name();
        match self.part {
            PrivateClusterPart::Endpoint | PrivateClusterPart::Nodes => {
                let both_off = flag_off(name, old)? && flag_off(name, new)?;
                Ok(both_off && !is_set(ctx.sibling(ENDPOINT_SUBNETWORK)))
            }
            PrivateClusterPart::Block => {
                for key in [PRIVATE_ENDPOINT, PRIVATE_NODES] {
                    let off_before = flag_off(name, block_key(old, key))?;
                    if !(off_before && flag_off(name, block_key(new, key))?) {
                        return Ok(false);
                    }
                }
                let configured = [ENDPOINT_SUBNETWORK, GLOBAL_ACCESS]
                    .iter()
                    .any(|key| block_key(old, key).is_some() || block_key(new, key).is_some());
                Ok(!configured)
            }
            PrivateClusterPart::Subnetwork => {
                let blank = |s: Option<&str>| s.map_or(true, str::is_empty);
                let dropped = blank(string_of(name, old)?) != blank(string_of(name, new)?);
                if dropped && is_set(ctx.sibling(MASTER_CIDR)) {
                    return Ok(true);
                }
                SelfLinkOrName.is_equivalent(old, new, ctx)
            }
        }
    }
}

fn build_private_cluster_config(argument: Option<&str>) -> Built {
    let raw = required_argument("private_cluster_config", argument)?;
    let part = match raw {
        "block" => PrivateClusterPart::Block,
        "endpoint" => PrivateClusterPart::Endpoint,
        "nodes" => PrivateClusterPart::Nodes,
        "subnetwork" => PrivateClusterPart::Subnetwork,
        other => {
            return Err(invalid_argument(
                "private_cluster_config",
                other,
                "expected block, endpoint, nodes or subnetwork",
            ))
        }
    };
    Ok(Arc::new(PrivateClusterConfig { part }))
}

inventory::submit! {
    PredicateFactory {
        family: "private_cluster_config",
        summary: "private cluster flags off on both sides are unset (private_cluster_config:PART)",
        build: build_private_cluster_config,
    }
}

/// A zero value ≡ absent while a sibling toggle is off.
#[derive(Debug)]
pub struct ZeroUnless {
    toggle: String,
}

impl EquivalencePredicate for ZeroUnless {
    fn name(&self) -> &str {
        "zero_unless"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let zero = |v: Option<&Value>| v.map_or(true, Value::is_zero);
        if !(zero(old) && zero(new)) {
            return Ok(false);
        }
        match ctx.sibling(&self.toggle) {
            None => Ok(true),
            Some(toggle) => toggle
                .as_bool()
                .map(|on| !on)
                .ok_or_else(|| unexpected(self.name(), "bool", toggle)),
        }
    }
}

fn build_zero_unless(argument: Option<&str>) -> Built {
    let toggle = required_argument("zero_unless", argument)?;
    Ok(Arc::new(ZeroUnless {
        toggle: toggle.to_string(),
    }))
}

inventory::submit! {
    PredicateFactory {
        family: "zero_unless",
        summary: "zero equals absent while the named sibling toggle is off (zero_unless:SIBLING)",
        build: build_zero_unless,
    }
}

/// Any difference is suppressed while a sibling holds a given literal.
#[derive(Debug)]
pub struct SuppressWhen {
    sibling: String,
    literal: String,
}

impl EquivalencePredicate for SuppressWhen {
    fn name(&self) -> &str {
        "suppress_when"
    }

    fn is_equivalent(
        &self,
        _old: Option<&Value>,
        _new: Option<&Value>,
        ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        Ok(match ctx.sibling(&self.sibling) {
            Some(Value::Scalar(Scalar::String(s))) => *s == self.literal,
            Some(Value::Scalar(scalar)) => scalar.to_string() == self.literal,
            _ => false,
        })
    }
}

fn build_suppress_when(argument: Option<&str>) -> Built {
    let raw = required_argument("suppress_when", argument)?;
    let Some((sibling, literal)) = raw.split_once('=') else {
        return Err(invalid_argument("suppress_when", raw, "expected SIBLING=LITERAL"));
    };
    if sibling.trim().is_empty() {
        return Err(invalid_argument("suppress_when", raw, "empty sibling name"));
    }
    Ok(Arc::new(SuppressWhen {
        sibling: sibling.trim().to_string(),
        literal: literal.trim().to_string(),
    }))
}

inventory::submit! {
    PredicateFactory {
        family: "suppress_when",
        summary: "ignore differences while a sibling equals a value (suppress_when:SIBLING=VALUE)",
        build: build_suppress_when,
    }
}

/// RFC 5545 recurrence rules compared by meaning for the daily case.
#[derive(Debug)]
pub struct Rfc5545Recurrence;

const ALL_DAYS: [&str; 7] = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

fn normalise_rrule(raw: &str) -> BTreeMap<String, String> {
    let mut parts: BTreeMap<String, String> = raw
        .trim()
        .trim_start_matches("RRULE:")
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_uppercase(), v.trim().to_ascii_uppercase()),
            None => (part.trim().to_ascii_uppercase(), String::new()),
        })
        .collect();

    let weekly_every_day = parts.get("FREQ").map(String::as_str) == Some("WEEKLY")
        && parts.get("BYDAY").is_some_and(|days| {
            let days: BTreeSet<&str> = days.split(',').map(str::trim).collect();
            ALL_DAYS.iter().all(|d| days.contains(d)) && days.len() == ALL_DAYS.len()
        });
    if weekly_every_day {
        parts.remove("BYDAY");
        parts.insert("FREQ".to_string(), "DAILY".to_string());
    }
    parts
}

impl EquivalencePredicate for Rfc5545Recurrence {
    fn name(&self) -> &str {
        "rfc5545_recurrence"
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        _ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError> {
        let Some((o, n)) = both_strings(self.name(), old, new)? else {
            return Ok(false);
        };
        Ok(normalise_rrule(o) == normalise_rrule(n))
    }
}

fn build_rfc5545_recurrence(argument: Option<&str>) -> Built {
    no_argument("rfc5545_recurrence", argument)?;
    Ok(Arc::new(Rfc5545Recurrence))
}

inventory::submit! {
    PredicateFactory {
        family: "rfc5545_recurrence",
        summary: "recurrence rules equal by meaning (weekly on every day = FREQ=DAILY)",
        build: build_rfc5545_recurrence,
    }
}

#[cfg(test)]
mod tests {
    use value_tree_core::{Fields, Value};

    use super::parse_duration;
    use crate::equivalence::predicate::{build_predicate, EquivalenceContext, PredicateError};

    fn check(
        reference: &str,
        old: Option<Value>,
        new: Option<Value>,
    ) -> Result<bool, PredicateError> {
        check_with(reference, old, new, "field", &Fields::new())
    }

    fn check_with(
        reference: &str,
        old: Option<Value>,
        new: Option<Value>,
        path: &str,
        config: &Fields,
    ) -> Result<bool, PredicateError> {
        let predicate = build_predicate(reference).expect("predicate builds");
        let ctx = EquivalenceContext::new(path, config);
        predicate.is_equivalent(old.as_ref(), new.as_ref(), &ctx)
    }

    fn s(v: &str) -> Option<Value> {
        Some(Value::from(v))
    }

    #[test]
    fn rfc3339_time_pads_single_digit_hours() {
        assert_eq!(check("rfc3339_time", s("1:00"), s("01:00")), Ok(true));
        assert_eq!(check("rfc3339_time", s("01:00"), s("1:00")), Ok(true));
        assert_eq!(check("rfc3339_time", s("1:00"), s("02:00")), Ok(false));
        assert_eq!(check("rfc3339_time", None, s("01:00")), Ok(false));
    }

    #[test]
    fn empty_or_default_and_unspecified_enum() {
        assert_eq!(check("empty_or_default:STANDARD", s(""), s("STANDARD")), Ok(true));
        assert_eq!(check("empty_or_default:STANDARD", None, s("STANDARD")), Ok(true));
        assert_eq!(check("empty_or_default:STANDARD", s(""), s("PREMIUM")), Ok(false));

        assert_eq!(check("unspecified_enum", s(""), s("DNS_SCOPE_UNSPECIFIED")), Ok(true));
        assert_eq!(check("unspecified_enum", None, s("PROVIDER_UNSPECIFIED")), Ok(true));
        assert_eq!(check("unspecified_enum", s(""), s("CLUSTER_SCOPE")), Ok(false));
    }

    #[test]
    fn has_been_enabled_only_suppresses_true_to_false() {
        let t = Some(Value::from(true));
        let f = Some(Value::from(false));
        assert_eq!(check("has_been_enabled", t.clone(), f.clone()), Ok(true));
        assert_eq!(check("has_been_enabled", f.clone(), t.clone()), Ok(false));
        assert_eq!(check("has_been_enabled", None, f.clone()), Ok(false));
        assert_eq!(check("has_been_enabled", t, None), Ok(false));
        assert!(matches!(
            check("has_been_enabled", s("yes"), f),
            Err(PredicateError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn empty_block_collapses_zero_valued_elements() {
        let zero_block = Some(Value::List(vec![Value::object([
            ("empty_string", Value::from("")),
            ("example_list", Value::List(Vec::new())),
        ])]));
        let tagged = Some(Value::List(vec![Value::object([(
            "network_tags",
            Value::List(vec![Value::object([(
                "tags",
                Value::List(vec![Value::from("test-network-tag")]),
            )])]),
        )])]));

        let empty = Some(Value::List(Vec::new()));
        assert_eq!(check("empty_block", empty, zero_block.clone()), Ok(true));
        assert_eq!(check("empty_block", zero_block, None), Ok(true));
        assert_eq!(check("empty_block", None, tagged.clone()), Ok(false));
        assert_eq!(check("empty_block", tagged, None), Ok(false));
    }

    #[test]
    fn self_link_or_name_matches_same_resource() {
        let link = "https://www.googleapis.com/compute/v1/projects/p/global/networks/default";
        assert_eq!(check("self_link_or_name", s(link), s("default")), Ok(true));
        assert_eq!(
            check("self_link_or_name", s(link), s("projects/p/global/networks/default")),
            Ok(true)
        );
        assert_eq!(check("self_link_or_name", s(link), s("other")), Ok(false));
    }

    #[test]
    fn string_normalisation_families() {
        assert_eq!(check("case_insensitive", s("Value"), s("value")), Ok(true));
        assert_eq!(check("case_insensitive", s("value"), s("NewValue")), Ok(false));

        assert_eq!(check("duration", s("60.0s"), s("60s")), Ok(true));
        assert_eq!(check("duration", s("65s"), s("60.0s")), Ok(false));
        assert_eq!(check("duration", s("1m"), s("60s")), Ok(true));
        assert!(matches!(
            check("duration", s("soon"), s("60s")),
            Err(PredicateError::Malformed { .. })
        ));

        let run = "https://hello-rehvs75zla-uc.a.run.app";
        assert_eq!(check("trailing_slash", s(&format!("{run}/")), s(run)), Ok(true));
        assert_eq!(
            check("trailing_slash", s("https://x.a.run.app/"), s("https://y.a.run.app")),
            Ok(false)
        );
    }

    #[test]
    fn numeric_and_enum_alias() {
        assert_eq!(check("numeric", Some(Value::from(3)), Some(Value::from(3.0))), Ok(true));
        assert_eq!(check("numeric", s("3"), Some(Value::from(3))), Ok(true));
        assert_eq!(check("numeric", Some(Value::from(3)), Some(Value::from(3.5))), Ok(false));

        let alias = "enum_alias:STANDARD=STANDARD_TIER,PREMIUM=PREMIUM_TIER";
        assert_eq!(check(alias, s("STANDARD"), s("STANDARD_TIER")), Ok(true));
        assert_eq!(check(alias, s("STANDARD"), s("PREMIUM_TIER")), Ok(false));
        assert!(build_predicate("enum_alias:broken").is_err());
    }

    #[test]
    fn disabled_block_only_suppresses_a_dropped_disabled_block() {
        let off = Some(Value::List(vec![Value::object([
            ("enabled", Value::from(false)),
            ("provider", Value::from("PROVIDER_UNSPECIFIED")),
        ])]));
        let on = Some(Value::List(vec![Value::object([("enabled", Value::from(true))])]));

        assert_eq!(check("disabled_block", off.clone(), None), Ok(true));
        assert_eq!(check("disabled_block", off.clone(), Some(Value::List(Vec::new()))), Ok(true));
        assert_eq!(check("disabled_block", None, off), Ok(false));
        assert_eq!(check("disabled_block", on, None), Ok(false));
        assert!(!build_predicate("disabled_block").expect("builds").symmetric());
    }

    #[test]
    fn disabled_block_can_require_a_key_to_stay_unchanged() {
        let block = |mode: &str| {
            Some(Value::List(vec![Value::object([
                ("enabled", Value::from(false)),
                ("evaluation_mode", Value::from(mode)),
            ])]))
        };
        let reference = "disabled_block:evaluation_mode";

        assert_eq!(check(reference, block(""), None), Ok(true));
        assert_eq!(check(reference, block("PROJECT_SINGLETON_POLICY_ENFORCE"), None), Ok(false));
        let enforced = block("PROJECT_SINGLETON_POLICY_ENFORCE");
        assert_eq!(check("disabled_block", enforced, None), Ok(true));
        assert!(build_predicate("disabled_block:").is_err());
    }

    #[test]
    fn cidr_or_size_matches_prefix_length() {
        assert_eq!(check("cidr_or_size", s("/14"), s("10.4.0.0/14")), Ok(true));
        assert_eq!(check("cidr_or_size", s("10.4.0.0/14"), s("/14")), Ok(true));
        assert_eq!(check("cidr_or_size", s("/14"), s("10.4.0.0/16")), Ok(false));
        assert_eq!(check("cidr_or_size", s("10.4.0.0/14"), s("10.8.0.0/14")), Ok(false));
        assert_eq!(check("cidr_or_size", s("/14"), None), Ok(false));
    }

    #[test]
    fn added_scopes_tolerate_the_implicit_scope() {
        let scopes = |items: &[&str]| Some(Value::set(items.iter().map(|i| Value::from(*i))));
        let reference = "added_scopes:monitoring.write";

        assert_eq!(
            check(reference, scopes(&["storage-ro"]), scopes(&["storage-ro", "monitoring.write"])),
            Ok(true)
        );
        assert_eq!(
            check(reference, scopes(&["monitoring.write", "storage-ro"]), scopes(&["storage-ro"])),
            Ok(true)
        );
        assert_eq!(
            check(reference, scopes(&["storage-ro"]), scopes(&["storage-rw", "monitoring.write"])),
            Ok(false)
        );
        assert_eq!(
            check(reference, scopes(&["storage-ro"]), scopes(&["storage-ro", "compute"])),
            Ok(false)
        );
        assert!(build_predicate("added_scopes").is_err());
    }

    #[test]
    fn autopilot_suppresses_while_enabled() {
        let mut config = Fields::new();
        config.insert("enable_autopilot".into(), Value::from(true));
        let path = "cluster_autoscaling.0.autoscaling_profile";

        let profile = s("OPTIMIZE_UTILIZATION");
        assert_eq!(check_with("autopilot", s("BALANCED"), profile, path, &config), Ok(true));
        assert_eq!(check_with("autopilot", s("BALANCED"), None, path, &Fields::new()), Ok(false));

        let dns = |domain: &str| {
            Some(Value::List(vec![Value::object([
                ("cluster_dns", Value::from("CLOUD_DNS")),
                ("additive_vpc_scope_dns_domain", Value::from(domain)),
            ])]))
        };
        let reference = "autopilot:additive_vpc_scope_dns_domain";
        assert_eq!(check_with(reference, dns(""), None, "dns_config", &config), Ok(true));
        assert_eq!(
            check_with(reference, dns("corp.example"), None, "dns_config", &config),
            Ok(false)
        );
    }

    #[test]
    fn private_cluster_flags_off_on_both_sides_are_unset() {
        let off = Some(Value::from(false));
        let on = Some(Value::from(true));
        let path = "private_cluster_config.0.enable_private_endpoint";
        let private = |pairs: Vec<(&str, Value)>| {
            let mut config = Fields::new();
            config.insert("private_cluster_config".into(), Value::List(vec![Value::object(pairs)]));
            config
        };

        let plain = private(vec![("enable_private_endpoint", Value::from(false))]);
        let endpoint = "private_cluster_config:endpoint";
        assert_eq!(check_with(endpoint, off.clone(), None, path, &plain), Ok(true));
        assert_eq!(check_with(endpoint, on, None, path, &plain), Ok(false));

        let subnet = private(vec![("private_endpoint_subnetwork", Value::from("sub"))]);
        assert_eq!(check_with("private_cluster_config:nodes", off, None, path, &subnet), Ok(false));

        let block = |pairs: Vec<(&str, Value)>| Some(Value::List(vec![Value::object(pairs)]));
        let flags_off = block(vec![
            ("enable_private_nodes", Value::from(false)),
            ("enable_private_endpoint", Value::from(false)),
        ]);
        let global = block(vec![(
            "master_global_access_config",
            Value::List(vec![Value::object([("enabled", Value::from(true))])]),
        )]);
        assert_eq!(check("private_cluster_config:block", flags_off.clone(), None), Ok(true));
        assert_eq!(check("private_cluster_config:block", flags_off, global), Ok(false));
        assert!(build_predicate("private_cluster_config:other").is_err());
    }

    #[test]
    fn private_endpoint_subnetwork_may_be_dropped_beside_a_master_cidr() {
        let mut config = Fields::new();
        config.insert(
            "private_cluster_config".into(),
            Value::List(vec![Value::object([(
                "master_ipv4_cidr_block",
                Value::from("172.16.0.0/28"),
            )])]),
        );
        let path = "private_cluster_config.0.private_endpoint_subnetwork";
        let reference = "private_cluster_config:subnetwork";

        assert_eq!(check_with(reference, s("sub"), s(""), path, &config), Ok(true));
        assert_eq!(check_with(reference, s("sub"), s(""), path, &Fields::new()), Ok(false));
        assert_eq!(
            check_with(
                reference,
                s("projects/p/regions/r/subnetworks/sub"),
                s("sub"),
                path,
                &Fields::new()
            ),
            Ok(true)
        );
    }

    #[test]
    fn sibling_conditioned_families() {
        let mut config = Fields::new();
        config.insert(
            "autoscaling".into(),
            Value::List(vec![Value::object([
                ("enabled", Value::from(false)),
                ("mode", Value::from("OFF")),
            ])]),
        );
        let path = "autoscaling.0.min_node_count";

        assert_eq!(
            check_with("zero_unless:enabled", Some(Value::from(0)), None, path, &config),
            Ok(true)
        );
        assert_eq!(
            check_with("zero_unless:enabled", Some(Value::from(2)), None, path, &config),
            Ok(false)
        );
        assert_eq!(
            check_with("suppress_when:mode=OFF", s("a"), s("b"), path, &config),
            Ok(true)
        );
        assert_eq!(
            check_with("suppress_when:mode=ON", s("a"), s("b"), path, &config),
            Ok(false)
        );
    }

    #[test]
    fn recurrence_daily_equals_weekly_every_day() {
        assert_eq!(
            check(
                "rfc5545_recurrence",
                s("FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR,SA,SU"),
                s("FREQ=DAILY")
            ),
            Ok(true)
        );
        assert_eq!(
            check("rfc5545_recurrence", s("FREQ=WEEKLY;BYDAY=MO,TU"), s("FREQ=DAILY")),
            Ok(false)
        );
    }

    #[test]
    fn durations_parse_compound_units() {
        assert_eq!(parse_duration("1h30m"), Some(5400.0));
        assert_eq!(parse_duration("250ms"), Some(0.25));
        assert_eq!(parse_duration("0"), Some(0.0));
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("10x"), None);
    }
}
