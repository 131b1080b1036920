/// Fold text for marker matching: uppercase, Spanish accents removed,
/// whitespace runs collapsed to a single space.
///
/// Only used for comparisons. Field patterns always run on the original text.
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = true;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
            continue;
        }
        prev_space = false;
        match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => out.push('A'),
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => out.push('E'),
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => out.push('I'),
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => out.push('O'),
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => out.push('U'),
            'ñ' | 'Ñ' => out.push('N'),
            _ => out.extend(c.to_uppercase()),
        }
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Collapse internal whitespace and trim.
pub fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
