use topoanon_core::{
    AssembledTopology, DisabledGeocoder, Inventory, Link, RecordSet, ResolutionContext,
    TopologyAssembler, TopologyOptions,
};

/// Runs one offline conversion.
#[must_use]
pub fn assemble(records: &RecordSet, options: TopologyOptions) -> AssembledTopology {
    let inventory = Inventory::collect(records);
    let mut context = ResolutionContext::new(DisabledGeocoder, &options);
    TopologyAssembler::new(options).build(&inventory, &mut context)
}

/// Returns a link's endpoint URNs as text, sorted.
#[must_use]
pub fn endpoint_pair(link: &Link) -> (String, String) {
    let [a, b] = &link.endpoints;
    let (a, b) = (a.to_string(), b.to_string());
    if a <= b { (a, b) } else { (b, a) }
}
