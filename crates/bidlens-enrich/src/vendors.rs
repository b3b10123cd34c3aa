//! Ad-tech vendor labels by request host.

use url::Url;

/// Registrable domain to vendor name. A host matches its domain and every
/// subdomain of it.
const VENDOR_DOMAINS: &[(&str, &str)] = &[
    ("adnxs.com", "AppNexus (Xandr)"),
    ("appnexus.com", "AppNexus (Xandr)"),
    ("pubmatic.com", "PubMatic"),
    ("openx.net", "OpenX"),
    ("openx.com", "OpenX"),
    ("rubiconproject.com", "Magnite (Rubicon Project)"),
    ("criteo.com", "Criteo"),
    ("amazon-adsystem.com", "Amazon"),
    ("doubleclick.net", "Google"),
    ("casalemedia.com", "Index Exchange"),
    ("indexexchange.com", "Index Exchange"),
    ("ads.yahoo.com", "Yahoo"),
    ("sharethrough.com", "Sharethrough"),
    ("bidr.io", "Beeswax"),
    ("gumgum.com", "GumGum"),
    ("lijit.com", "Sovrn"),
    ("sovrn.com", "Sovrn"),
    ("adroll.com", "AdRoll"),
    ("vimeo.com", "Vimeo"),
    ("adsrvr.org", "The Trade Desk"),
    ("demdex.net", "Adobe Audience Manager"),
    ("facebook.com", "Meta"),
    ("sonobi.com", "Sonobi"),
    ("contextweb.com", "PulsePoint"),
    ("adform.net", "Adform"),
    ("adblade.com", "Adblade"),
    ("adtechus.com", "Verizon Media (AdTech)"),
    ("adthrive.com", "Raptive (AdThrive)"),
    ("adzerk.net", "Kevel (Adzerk)"),
    ("districtm.io", "District M"),
    ("triplelift.com", "TripleLift"),
    ("yieldmo.com", "Yieldmo"),
];

/// Vendor owning the URL's host, if known.
#[must_use]
pub fn vendor_for_url(url: &str) -> Option<&'static str> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    VENDOR_DOMAINS
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, vendor)| *vendor)
}
